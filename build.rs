//! Build script for minifying the embedded live-reload client.

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use std::fs;
use std::path::Path;

const WS_PORT_PLACEHOLDER: &str = "__SITEPIPE_WS_PORT__";

fn main() {
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let out_path = Path::new(&out_dir);

    minify_reload_js_file("src/embed/serve/reload.js", &out_path.join("reload.min.js"));

    println!("cargo:rerun-if-changed=src/embed/serve/reload.js");
}

fn minify_js(source: &str) -> String {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs();

    let ret = Parser::new(&allocator, source, source_type).parse();
    assert!(ret.errors.is_empty(), "Parse errors: {:?}", ret.errors);

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code
}

fn minify_reload_js_file(input: &str, output: &Path) {
    let source = fs::read_to_string(input).expect("Failed to read reload.js");
    let code = minify_js(&source);

    // The port is substituted at serve time, so the placeholder string must survive.
    assert_eq!(
        code.matches(WS_PORT_PLACEHOLDER).count(),
        1,
        "reload.js must contain exactly one {} placeholder",
        WS_PORT_PLACEHOLDER
    );

    fs::write(output, code).expect("Failed to write minified reload JS");
}
