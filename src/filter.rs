//! Date-range presets and the filter panel sequence.

use crate::browser::Driver;
use crate::config::{Timing, ms};
use crate::error::HarvestError;
use crate::interact::{Interactor, Step};
use crate::status::StatusSink;
use crate::targets;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Date range selectable in the grid's filter panel.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FilterPreset {
    #[default]
    Today,
    Yesterday,
    CurrentWeek,
    PreviousWeek,
    CurrentMonth,
    PreviousMonth,
    CurrentYear,
    PreviousYear,
}

/// Number of options in the portal's range picker.
pub const PRESET_OPTION_COUNT: u8 = 8;

/// Picker position of every preset, as shown in the portal.
pub const PRESET_TABLE: [(FilterPreset, &str, u8); PRESET_OPTION_COUNT as usize] = [
    (FilterPreset::Today, "Today", 1),
    (FilterPreset::Yesterday, "Yesterday", 2),
    (FilterPreset::CurrentWeek, "Current Week", 3),
    (FilterPreset::PreviousWeek, "Previous Week", 4),
    (FilterPreset::CurrentMonth, "Current Month", 5),
    (FilterPreset::PreviousMonth, "Previous Month", 6),
    (FilterPreset::CurrentYear, "Current Year", 7),
    (FilterPreset::PreviousYear, "Previous Year", 8),
];

impl FilterPreset {
    fn entry(self) -> (FilterPreset, &'static str, u8) {
        PRESET_TABLE
            .into_iter()
            .find(|(preset, _, _)| *preset == self)
            .unwrap_or(PRESET_TABLE[0])
    }

    /// 1-based position in the range picker.
    pub fn ordinal(self) -> u8 {
        self.entry().2
    }

    pub fn label(self) -> &'static str {
        self.entry().1
    }
}

/// The full panel sequence for `preset`, in execution order.
pub fn plan(preset: FilterPreset, timing: &Timing) -> Vec<Step> {
    let click_wait = ms(timing.filter_click_wait_ms);
    let picker_wait = ms(timing.filter_picker_wait_ms);
    let step_settle = ms(timing.filter_step_settle_ms);

    let mut steps = vec![
        Step::pause(step_settle),
        Step::click(targets::type_settings_toggle())
            .within(click_wait)
            .settle(step_settle),
        Step::script(targets::DESELECT_DEFAULTS_SCRIPT),
    ];
    steps.extend(
        targets::type_options()
            .into_iter()
            .map(|option| Step::click(option).within(click_wait)),
    );
    steps.extend([
        Step::click(targets::date_range_toggle())
            .within(picker_wait)
            .settle(step_settle),
        Step::click(targets::date_range_option().at_ordinal(preset.ordinal()))
            .within(picker_wait)
            .settle(step_settle),
        Step::click(targets::filter_confirm())
            .within(click_wait)
            .settle(step_settle),
        Step::script(targets::DESELECT_RESIDUAL_SCRIPT),
        Step::pause(ms(timing.filter_selection_settle_ms)),
        Step::pause(ms(timing.post_filter_settle_ms)),
    ]);
    steps
}

pub struct FilterApplicator<'a> {
    timing: &'a Timing,
}

impl<'a> FilterApplicator<'a> {
    pub fn new(timing: &'a Timing) -> Self {
        Self { timing }
    }

    /// Run the panel sequence. The first failing step aborts the rest.
    pub async fn apply<D: Driver + ?Sized>(
        &self,
        interactor: &Interactor<'_, D>,
        preset: FilterPreset,
        status: &dyn StatusSink,
    ) -> Result<(), HarvestError> {
        status.info(&format!(
            "Applying date range '{}' (option #{})...",
            preset.label(),
            preset.ordinal()
        ));
        match interactor.run_all(&plan(preset, self.timing)).await {
            Ok(()) => {
                info!(preset = %preset, "Filter applied");
                status.info("Filter applied.");
                Ok(())
            }
            Err(failure) => {
                let error = HarvestError::FilterApplication(failure.to_string());
                status.warn(&format!("{error}, proceeding with the default view."));
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::BrowserOptions;
    use crate::interact::Act;
    use crate::locator::Locator;
    use crate::status::MemoryStatus;
    use crate::testing::FakeDriver;

    #[test]
    fn ordinals_are_contiguous() {
        let mut ordinals: Vec<u8> = PRESET_TABLE.iter().map(|(_, _, o)| *o).collect();
        ordinals.sort_unstable();
        assert_eq!(ordinals, (1..=PRESET_OPTION_COUNT).collect::<Vec<_>>());

        let presets: std::collections::HashSet<FilterPreset> =
            PRESET_TABLE.iter().map(|(p, _, _)| *p).collect();
        assert_eq!(presets.len(), PRESET_OPTION_COUNT as usize);
    }

    #[test]
    fn preset_lookup() {
        assert_eq!(FilterPreset::Today.ordinal(), 1);
        assert_eq!(FilterPreset::PreviousMonth.ordinal(), 6);
        assert_eq!(FilterPreset::PreviousYear.label(), "Previous Year");
        assert_eq!(FilterPreset::CurrentWeek.to_string(), "current-week");
    }

    #[test]
    fn plan_selects_preset_ordinal() {
        let steps = plan(FilterPreset::PreviousWeek, &Timing::default());
        assert_eq!(steps.len(), 14);
        let option = steps
            .iter()
            .filter_map(|s| s.locate.as_ref())
            .find(|l| l.target.name == "date range option")
            .unwrap();
        assert!(matches!(&option.target.locators[0], Locator::XPath(p) if p.ends_with("span[4]")));

        let scripts = steps.iter().filter(|s| matches!(s.act, Act::Script(_))).count();
        assert_eq!(scripts, 2);
        assert_eq!(steps.last().unwrap().settle, ms(Timing::default().post_filter_settle_ms));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_panel_is_a_filter_failure() {
        let driver = FakeDriver::new();
        let timing = Timing::default();
        let status = MemoryStatus::new();
        let interactor = Interactor::new(&driver, &BrowserOptions::default());
        let result = FilterApplicator::new(&timing)
            .apply(&interactor, FilterPreset::Today, &status)
            .await;

        assert!(matches!(result, Err(HarvestError::FilterApplication(m)) if m.contains("activity type panel")));
        assert!(status.contains("proceeding with the default view"));
        assert!(driver.scripts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn full_plan_clicks_in_order() {
        let driver = FakeDriver::new();
        let steps = plan(FilterPreset::CurrentMonth, &Timing::default());
        let located: Vec<Locator> = steps
            .iter()
            .filter_map(|s| s.locate.as_ref())
            .map(|l| l.target.locators[0].clone())
            .collect();
        for locator in &located {
            driver.show(locator);
        }

        let timing = Timing::default();
        let status = MemoryStatus::new();
        let interactor = Interactor::new(&driver, &BrowserOptions::default());
        FilterApplicator::new(&timing)
            .apply(&interactor, FilterPreset::CurrentMonth, &status)
            .await
            .unwrap();

        assert_eq!(driver.clicks(), located);
        assert_eq!(
            driver.scripts(),
            vec![targets::DESELECT_DEFAULTS_SCRIPT, targets::DESELECT_RESIDUAL_SCRIPT]
        );
    }
}
