//! Per-target damage reports.
//!
//! A closed target is summarised into nested totals (name, then damage type)
//! and rendered either as a table or as a single condensed line.

use std::collections::HashMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::model::DamageEvent;
use super::target::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReportStyle {
    #[default]
    Full,
    Condensed,
    Both,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DamageRow {
    pub name: String,
    pub total: i64,
    /// Damage type subtotals, largest first.
    pub by_type: Vec<(String, i64)>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DamageSection {
    /// Largest contributor first.
    pub rows: Vec<DamageRow>,
    pub total: i64,
}

impl DamageSection {
    fn from_events<'a>(groups: impl Iterator<Item = (&'a str, &'a [DamageEvent])>) -> Self {
        let mut totals: HashMap<&str, HashMap<&str, i64>> = HashMap::new();
        let mut total = 0;

        for (name, events) in groups {
            for event in events {
                let dealt = event.damage_dealt();
                if dealt == 0 {
                    continue;
                }
                total += dealt;
                *totals
                    .entry(name)
                    .or_default()
                    .entry(event.damage_type())
                    .or_insert(0) += dealt;
            }
        }

        let mut rows: Vec<DamageRow> = totals
            .into_iter()
            .map(|(name, types)| {
                let mut by_type: Vec<(String, i64)> = types
                    .into_iter()
                    .map(|(kind, amount)| (kind.to_string(), amount))
                    .collect();
                by_type.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                DamageRow {
                    name: name.to_string(),
                    total: by_type.iter().map(|(_, amount)| amount).sum(),
                    by_type,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));

        Self { rows, total }
    }
}

pub fn percent(part: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Damage per second over the combat window. A zero-length fight counts as one second.
pub fn dps(total: i64, duration_secs: i64) -> f64 {
    total as f64 / duration_secs.max(1) as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetReport {
    pub target: String,
    pub level: f64,
    pub duration_secs: i64,
    /// Damage the target dealt, by victim.
    pub damage_to: DamageSection,
    /// Damage the target took, by attacker.
    pub damage_by: DamageSection,
}

impl TargetReport {
    pub fn from_target(target: &Target) -> Self {
        Self {
            target: target.name().to_string(),
            level: target.implied_level(),
            duration_secs: target.combat_duration_secs(),
            damage_to: DamageSection::from_events(target.outgoing()),
            damage_by: DamageSection::from_events(target.incoming()),
        }
    }

    pub fn render(&self, style: ReportStyle) -> Vec<String> {
        match style {
            ReportStyle::Full => vec![self.render_full()],
            ReportStyle::Condensed => vec![self.render_condensed()],
            ReportStyle::Both => vec![self.render_full(), self.render_condensed()],
        }
    }

    pub fn render_full(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} (level ~{:.2}) in {}s",
            self.target, self.level, self.duration_secs
        );
        self.render_section(&mut out, "Damage To", &self.damage_to);
        self.render_section(&mut out, "Damage By", &self.damage_by);
        out.trim_end().to_string()
    }

    fn render_section(&self, out: &mut String, title: &str, section: &DamageSection) {
        if section.rows.is_empty() {
            return;
        }
        let _ = writeln!(out, "{}:", title);
        for row in &section.rows {
            let _ = writeln!(
                out,
                "  {:<24} {:>8} {:>6.1}% {:>8.1} dps",
                row.name,
                row.total,
                percent(row.total, section.total),
                dps(row.total, self.duration_secs)
            );
            for (kind, amount) in &row.by_type {
                let _ = writeln!(
                    out,
                    "      {:<20} {:>8} {:>6.1}%",
                    kind,
                    amount,
                    percent(*amount, row.total)
                );
            }
        }
        let _ = writeln!(
            out,
            "  {:<24} {:>8} {:>6.1}% {:>8.1} dps",
            "Total",
            section.total,
            percent(section.total, section.total),
            dps(section.total, self.duration_secs)
        );
    }

    /// `{target}, {hp} hp in {secs}s (@{dps} dps) | {attacker} {dmg}@{dps} [{pct}%] | ...`
    pub fn render_condensed(&self) -> String {
        let section = &self.damage_by;
        let mut out = format!(
            "{}, {} hp in {}s (@{:.1} dps)",
            self.target,
            section.total,
            self.duration_secs,
            dps(section.total, self.duration_secs)
        );
        for row in &section.rows {
            let _ = write!(
                out,
                " | {} {}@{:.1} [{:.0}%]",
                row.name,
                row.total,
                dps(row.total, self.duration_secs),
                percent(row.total, section.total)
            );
        }
        out
    }
}
