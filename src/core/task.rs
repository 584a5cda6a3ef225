//! Named pipeline tasks.

use std::fmt;

/// A named, independently invokable unit of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Render pug pages into markup.
    Pages,
    /// Compile the entry stylesheet.
    Styles,
    /// Minify scripts.
    Scripts,
    /// Optimize images through the persistent cache.
    Images,
    /// Assemble the svg sprite.
    Sprite,
    /// Remove the output tree.
    Clean,
    /// Invalidate the image-optimization cache.
    Clear,
}

impl Task {
    /// Build tasks in default start order.
    pub const BUILD: [Self; 5] = [
        Self::Images,
        Self::Sprite,
        Self::Styles,
        Self::Pages,
        Self::Scripts,
    ];

    /// Task name, also used as the title of notices it raises.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pages => "pages",
            Self::Styles => "styles",
            Self::Scripts => "scripts",
            Self::Images => "images",
            Self::Sprite => "sprite",
            Self::Clean => "clean",
            Self::Clear => "clear",
        }
    }

    /// Whether authoring errors of this task are intercepted as notices.
    pub const fn intercepts_errors(self) -> bool {
        matches!(self, Self::Pages | Self::Styles)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_order() {
        let names: Vec<_> = Task::BUILD.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["images", "sprite", "styles", "pages", "scripts"]);
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(Task::Styles.to_string(), "styles");
        assert_eq!(format!("[{}]", Task::Clear), "[clear]");
    }

    #[test]
    fn test_only_pages_and_styles_intercept() {
        assert!(Task::Pages.intercepts_errors());
        assert!(Task::Styles.intercepts_errors());
        assert!(!Task::Scripts.intercepts_errors());
        assert!(!Task::Images.intercepts_errors());
        assert!(!Task::Sprite.intercepts_errors());
    }
}
