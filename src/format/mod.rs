//! Renders a change set into Slack display blocks.
//!
//! Formatting never reads the clock: the caller captures `now` once and
//! passes it in, so the same change set always renders to the same blocks.

pub mod blocks;

pub use blocks::{Block, TextObject};

use crate::diff::{ChangeSet, MetricDeltas};
use crate::model::Metric;
use chrono::{DateTime, Utc};

/// User-facing labels used in notification text
#[derive(Clone, Debug)]
pub struct Locale {
    pub banner: String,
    pub elapsed_label: String,
    pub national_label: String,
    pub current_label: String,
    pub new_marker: String,
    pub confirmed: String,
    pub dead: String,
    pub recovered: String,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            banner: ":biohazard_sign: *COVID-19 OPPDATERING* :biohazard_sign:".to_string(),
            elapsed_label: "Tid siden siste Slack melding".to_string(),
            national_label: "*:flag-no: Landsbasis :flag-no:*".to_string(),
            current_label: "Nåværende".to_string(),
            new_marker: ":new:".to_string(),
            confirmed: "Smittede".to_string(),
            dead: "Døde".to_string(),
            recovered: "Friskmeldte".to_string(),
        }
    }
}

impl Locale {
    pub fn metric_label(&self, metric: Metric) -> &str {
        match metric {
            Metric::Confirmed => &self.confirmed,
            Metric::Dead => &self.dead,
            Metric::Recovered => &self.recovered,
        }
    }
}

/// Render `change_set` as an ordered block sequence.
///
/// Layout: banner, elapsed-time context, then a divider and section for the
/// national totals and for each changed entity.
pub fn format_change_set(change_set: &ChangeSet, now: DateTime<Utc>, locale: &Locale) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(4 + change_set.entities.len() * 2);

    blocks.push(Block::section(locale.banner.clone()));
    blocks.push(Block::context(format!(
        "{}: {}",
        locale.elapsed_label,
        format_elapsed(now - change_set.reference_time)
    )));

    let mut text = locale.national_label.clone();
    text.push_str(&metric_lines(
        &change_set.totals.deltas,
        |m| change_set.totals.current.get(m),
        locale,
    ));
    blocks.push(Block::Divider);
    blocks.push(Block::section(text));

    for change in &change_set.entities {
        let mut text = format!("*{}*", change.entity.display_name());
        if change.is_new {
            text.push(' ');
            text.push_str(&locale.new_marker);
        }
        text.push_str(&metric_lines(
            &change.deltas.counts,
            |m| change.entity.get(m),
            locale,
        ));
        blocks.push(Block::Divider);
        blocks.push(Block::section(text));
    }

    blocks
}

/// One line per nonzero delta, each prefixed with a newline.
///
/// Only count metrics are rendered; the per-capita delta is not shown.
fn metric_lines(deltas: &MetricDeltas, current: impl Fn(Metric) -> u64, locale: &Locale) -> String {
    let mut text = String::new();
    for (&metric, &delta) in deltas {
        if delta == 0 {
            continue;
        }
        let arrow = if delta > 0 { "▲" } else { "▼" };
        text.push_str(&format!(
            "\n_{}_: {} *{}* | {}: *{}*",
            locale.metric_label(metric),
            arrow,
            signed(delta),
            locale.current_label,
            current(metric)
        ));
    }
    text
}

fn signed(delta: i64) -> String {
    if delta > 0 {
        format!("+{}", delta)
    } else {
        delta.to_string()
    }
}

/// Format a duration as `H:MM:SS`, or `N day(s), H:MM:SS` past one day.
///
/// Sub-second precision is dropped; negative spans render as zero.
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let clock = format!("{}:{:02}:{:02}", hours, minutes, seconds);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}
