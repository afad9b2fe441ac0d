//! Locator strategy: logical UI targets resolved through prioritized
//! identification schemes.
//!
//! A [`Target`] names one thing on the page ("login button", "next page
//! arrow") and carries an ordered list of [`Locator`]s. Callers never see
//! concrete selectors; they ask for a target and the first locator that
//! resolves wins. The concrete table lives in [`crate::targets`].

use std::fmt;

/// Identification scheme a locator uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    ById,
    ByCss,
    ByXPath,
    ByText,
}

/// One way of finding an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Element `id` attribute.
    Id(String),
    /// CSS selector.
    Css(String),
    /// Structural XPath.
    XPath(String),
    /// Element of `tag` whose text content contains `needle`, case-insensitively.
    Text { tag: String, needle: String },
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(path: impl Into<String>) -> Self {
        Self::XPath(path.into())
    }

    pub fn text(tag: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Text {
            tag: tag.into(),
            needle: needle.into(),
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            Self::Id(_) => Capability::ById,
            Self::Css(_) => Capability::ByCss,
            Self::XPath(_) => Capability::ByXPath,
            Self::Text { .. } => Capability::ByText,
        }
    }

    /// Replace `{name}` in the selector with `value`.
    pub fn bind(&self, name: &str, value: impl fmt::Display) -> Self {
        let key = format!("{{{name}}}");
        let value = value.to_string();
        match self {
            Self::Id(s) => Self::Id(s.replace(&key, &value)),
            Self::Css(s) => Self::Css(s.replace(&key, &value)),
            Self::XPath(s) => Self::XPath(s.replace(&key, &value)),
            Self::Text { tag, needle } => Self::Text {
                tag: tag.clone(),
                needle: needle.replace(&key, &value),
            },
        }
    }

    /// Lower the locator to an XPath expression.
    ///
    /// `Id` and `Text` have exact XPath equivalents. `Css` has none and
    /// returns `None`; drivers resolve it natively.
    pub fn to_xpath(&self) -> Option<String> {
        match self {
            Self::Id(id) => Some(format!("//*[@id={}]", xpath_literal(id))),
            Self::XPath(path) => Some(path.clone()),
            Self::Text { tag, needle } => Some(format!(
                "//{tag}[contains(translate(., 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', \
                 'abcdefghijklmnopqrstuvwxyz'), {})]",
                xpath_literal(&needle.to_lowercase())
            )),
            Self::Css(_) => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Css(sel) => write!(f, "css={sel}"),
            Self::XPath(path) => write!(f, "xpath={path}"),
            Self::Text { tag, needle } => write!(f, "text={tag}~{needle:?}"),
        }
    }
}

/// Quote a string as an XPath 1.0 literal.
fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{s}'");
    }
    if !s.contains('"') {
        return format!("\"{s}\"");
    }
    let parts: Vec<String> = s.split('\'').map(|p| format!("'{p}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// A logical UI element and the locators that may find it, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: &'static str,
    pub locators: Vec<Locator>,
}

impl Target {
    pub fn new(name: &'static str, locators: Vec<Locator>) -> Self {
        Self { name, locators }
    }

    /// Bind a placeholder in every locator.
    pub fn bind(&self, name: &str, value: impl fmt::Display + Copy) -> Self {
        Self {
            name: self.name,
            locators: self.locators.iter().map(|l| l.bind(name, value)).collect(),
        }
    }

    /// Bind the 1-based `{row}` placeholder.
    pub fn at_row(&self, row: usize) -> Self {
        self.bind("row", row)
    }

    /// Bind the 1-based `{ordinal}` placeholder.
    pub fn at_ordinal(&self, ordinal: u8) -> Self {
        self.bind("ordinal", ordinal)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// What a wait requires of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Condition {
    /// Attached to the document.
    Present,
    /// Attached, visible and enabled.
    Clickable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_row_placeholder_everywhere() {
        let target = Target::new(
            "detail",
            vec![
                Locator::css("tbody > tr:nth-child({row}) > td span"),
                Locator::xpath("//tbody/tr[{row}]//span"),
            ],
        );
        let bound = target.at_row(7);
        assert_eq!(bound.locators[0], Locator::css("tbody > tr:nth-child(7) > td span"));
        assert_eq!(bound.locators[1], Locator::xpath("//tbody/tr[7]//span"));
        assert_eq!(bound.name, "detail");
    }

    #[test]
    fn text_locator_lowers_to_case_insensitive_xpath() {
        let xpath = Locator::text("button", "Accedi").to_xpath().unwrap();
        assert!(xpath.starts_with("//button[contains(translate(."));
        assert!(xpath.ends_with("'accedi')]"));
    }

    #[test]
    fn id_lowers_to_xpath_and_css_does_not() {
        assert_eq!(
            Locator::id("email").to_xpath().as_deref(),
            Some("//*[@id='email']")
        );
        assert_eq!(Locator::css("#email").to_xpath(), None);
    }

    #[test]
    fn xpath_literal_handles_quotes() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(xpath_literal("a'b\"c"), "concat('a', \"'\", 'b\"c')");
    }

    #[test]
    fn capabilities_are_tagged() {
        assert_eq!(Locator::id("x").capability(), Capability::ById);
        assert_eq!(Locator::text("a", "x").capability(), Capability::ByText);
        assert_eq!(Locator::xpath("//a").capability(), Capability::ByXPath);
    }
}
