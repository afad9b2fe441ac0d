//! Strategy table for the activity portal.
//!
//! Every concrete selector the engine uses is defined here. When the
//! portal's markup changes, this is the only file that should need edits.
//! Targets list their most stable locator first; the absolute structural
//! paths are the last resort.

use crate::locator::{Locator, Target};

const FILTER_BAR: &str = "/html/body/div[10]/div[4]/section/div[1]/div/div[3]/div[1]/div";
const GRID: &str = "#app > div.search-grid-wrapper > div:nth-child(2) > div > div > div > table > tbody";

// ── Authentication ──────────────────────────────────────────────────────────

pub fn return_to_login() -> Target {
    Target::new("return to login link", vec![Locator::text("a", "torna a login")])
}

pub fn email_field() -> Target {
    Target::new(
        "email field",
        vec![Locator::id("email"), Locator::css("input[type='email']")],
    )
}

pub fn password_field() -> Target {
    Target::new(
        "password field",
        vec![Locator::id("password"), Locator::css("input[type='password']")],
    )
}

pub fn login_submit() -> Target {
    Target::new(
        "login button",
        vec![
            Locator::text("button", "accedi"),
            Locator::css("button[id*='btn-login']"),
        ],
    )
}

/// URL fragment that marks a logged-in location.
pub const LOGIN_URL_MARKER: &str = "dashboard";

/// Independent signs of a logged-in page, checked in this order.
pub fn login_indicators() -> Vec<Target> {
    vec![
        Target::new(
            "welcome text",
            vec![Locator::xpath(
                "//*[contains(text(), 'Welcome') or contains(text(), 'Dashboard')]",
            )],
        ),
        Target::new(
            "logout control",
            vec![Locator::css("[href*='logout'], [onclick*='logout']")],
        ),
        Target::new("user avatar", vec![Locator::css(".user-avatar")]),
        Target::new("user menu", vec![Locator::id("user-menu")]),
    ]
}

// ── Search view ─────────────────────────────────────────────────────────────

pub fn activity_menu() -> Target {
    Target::new(
        "activity menu",
        vec![Locator::xpath(
            "/html/body/div[10]/div[2]/div[3]/div[1]/ul/li[8]/div/a/div/span",
        )],
    )
}

pub fn activity_search_entry() -> Target {
    Target::new(
        "activity search entry",
        vec![Locator::xpath(
            "/html/body/div[10]/div[2]/div[3]/div[1]/ul/li[8]/ul/li[1]/div/a/div/span",
        )],
    )
}

// ── Filter panel ────────────────────────────────────────────────────────────

pub fn type_settings_toggle() -> Target {
    Target::new(
        "activity type panel",
        vec![Locator::xpath(format!(
            "{FILTER_BAR}/div[2]/div/div[2]/div[1]/span"
        ))],
    )
}

/// Deselects the panel's default selection.
pub const DESELECT_DEFAULTS_SCRIPT: &str = r##"(function() {
  var el = document.querySelector("#app > div:nth-child(3) > div.by-scroll-container > div > div:nth-child(2) > div > div:nth-child(2) > div.dr-dropdown-panel > div:nth-child(2) > div:nth-child(2)");
  if (el) { el.click(); }
  return !!el;
})()"##;

/// Activity type options, clicked in this order.
pub fn type_options() -> Vec<Target> {
    const OPTIONS: [(&str, &str); 5] = [
        ("type option 1", "div[1]/div/span[1]"),
        ("type option 2", "div[2]/div/span[2]"),
        ("type option 3", "div[3]/div/span[1]"),
        ("type option 4", "div[4]/div/span[1]"),
        ("type option 5", "div[5]/div/span[1]"),
    ];
    OPTIONS
        .into_iter()
        .map(|(name, tail)| {
            Target::new(
                name,
                vec![Locator::xpath(format!(
                    "{FILTER_BAR}/div[2]/div/div[2]/div[2]/div[3]/{tail}"
                ))],
            )
        })
        .collect()
}

pub fn date_range_toggle() -> Target {
    Target::new(
        "date range control",
        vec![Locator::xpath(format!(
            "{FILTER_BAR}/div[4]/div/div/div/div[2]/span"
        ))],
    )
}

/// Range option at the `{ordinal}` position of the picker.
pub fn date_range_option() -> Target {
    Target::new(
        "date range option",
        vec![Locator::xpath(format!(
            "{FILTER_BAR}/div[4]/div/div/div/div[3]/div[1]/span[{{ordinal}}]"
        ))],
    )
}

pub fn filter_confirm() -> Target {
    Target::new(
        "filter confirm",
        vec![Locator::xpath(format!(
            "{FILTER_BAR}/div[3]/div/div[2]/div[1]/span"
        ))],
    )
}

/// Closes the selection panel left open after confirming.
pub const DESELECT_RESIDUAL_SCRIPT: &str = r##"(function() {
  var el = document.querySelector("#app > div:nth-child(3) > div.by-scroll-container > div > div:nth-child(3) > div > div:nth-child(2) > div.dr-dropdown-panel > div:nth-child(2) > div:nth-child(2)");
  if (el) { el.click(); }
  return !!el;
})()"##;

// ── Grid ────────────────────────────────────────────────────────────────────

/// Status text of the form "Pagina 3 di 12".
pub fn pagination_status() -> Target {
    Target::new(
        "pagination status",
        vec![Locator::xpath("//div[contains(text(), 'Pagina')]")],
    )
}

pub fn next_page() -> Target {
    Target::new(
        "next page arrow",
        vec![Locator::css(format!(
            "{GRID} > tr:nth-child(51) > td:nth-child(1) > div > div:nth-child(2) > span:nth-child(3)"
        ))],
    )
}

/// Drill-down control in the `{row}`-th grid row.
pub fn row_detail_open() -> Target {
    Target::new(
        "row detail control",
        vec![Locator::css(format!(
            "{GRID} > tr:nth-child({{row}}) > td:nth-child(23) > div > div > span"
        ))],
    )
}

pub fn detail_value() -> Target {
    Target::new(
        "detail value",
        vec![Locator::xpath(
            "/html/body/div[6]/div/div/div/div/div/div/div/div[4]/div[3]/div[2]/div[2]",
        )],
    )
}

pub fn detail_close() -> Target {
    Target::new(
        "detail close button",
        vec![Locator::css(
            "#vj-modal-manager > div > div > div > div > div > div > div > div:nth-child(6) > button.button-input-white > span:nth-child(1)",
        )],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_target_has_a_locator() {
        let mut all = vec![
            return_to_login(),
            email_field(),
            password_field(),
            login_submit(),
            activity_menu(),
            activity_search_entry(),
            type_settings_toggle(),
            date_range_toggle(),
            date_range_option(),
            filter_confirm(),
            pagination_status(),
            next_page(),
            row_detail_open(),
            detail_value(),
            detail_close(),
        ];
        all.extend(login_indicators());
        all.extend(type_options());
        assert!(all.iter().all(|t| !t.locators.is_empty()));
    }

    #[test]
    fn deselect_scripts_are_whole_expressions() {
        for script in [DESELECT_DEFAULTS_SCRIPT, DESELECT_RESIDUAL_SCRIPT] {
            assert!(script.starts_with("(function() {"));
            assert!(script.contains(r##"querySelector("#app > div:nth-child(3)"##));
            assert!(script.ends_with("})()"));
        }
        assert_ne!(DESELECT_DEFAULTS_SCRIPT, DESELECT_RESIDUAL_SCRIPT);
    }

    #[test]
    fn submit_prefers_label_over_identifier() {
        let submit = login_submit();
        assert_eq!(submit.locators[0], Locator::text("button", "accedi"));
        assert_eq!(submit.locators[1], Locator::css("button[id*='btn-login']"));
    }

    #[test]
    fn templated_targets_bind() {
        let option = date_range_option().at_ordinal(4);
        assert!(matches!(&option.locators[0], Locator::XPath(p) if p.ends_with("span[4]")));

        let detail = row_detail_open().at_row(12);
        assert!(matches!(&detail.locators[0], Locator::Css(s) if s.contains("tr:nth-child(12)")));
    }

    #[test]
    fn five_type_options_in_order() {
        let options = type_options();
        assert_eq!(options.len(), 5);
        assert!(matches!(&options[1].locators[0], Locator::XPath(p) if p.ends_with("div[2]/div/span[2]")));
    }
}
