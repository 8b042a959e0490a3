//! Climb tables and JSON route reports.
//!
//! Display names and titles are pass-through: names are keyed by the
//! 0-based position of a climb in the detected sequence and never affect
//! detection.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::detector::Climb;
use crate::error::Result;
use crate::summary::RouteSummary;

pub const DEFAULT_TITLE: &str = "Cycling Route Elevation Profile with Climbs";

/// One formatted row of the climb table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimbTableRow {
    /// 1-based climb number
    #[serde(rename = "Climb #")]
    pub number: usize,
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(rename = "Start (km)")]
    pub start_km: String,
    #[serde(rename = "End (km)")]
    pub end_km: String,
    #[serde(rename = "Distance (km)")]
    pub distance_km: String,
    #[serde(rename = "Elevation Gain (m)")]
    pub elevation_gain_m: String,
    #[serde(rename = "Avg Gradient (%)")]
    pub avg_gradient_pct: String,
    #[serde(rename = "Category")]
    pub category: String,
}

/// Format climbs as table rows, attaching names by climb position.
pub fn climb_table(climbs: &[Climb], names: &BTreeMap<usize, String>) -> Vec<ClimbTableRow> {
    climbs
        .iter()
        .enumerate()
        .map(|(i, climb)| ClimbTableRow {
            number: i + 1,
            name: names.get(&i).cloned(),
            start_km: format!("{:.2}", climb.start_distance_km),
            end_km: format!("{:.2}", climb.end_distance_km),
            distance_km: format!("{:.2}", climb.distance_km),
            elevation_gain_m: format!("{:.0}", climb.elevation_gain_m),
            avg_gradient_pct: format!("{:.1}", climb.avg_gradient_pct),
            category: climb.category.label().to_string(),
        })
        .collect()
}

/// Render rows as an aligned plain-text table. The name column only appears when a row has a name.
pub fn format_climb_table(rows: &[ClimbTableRow]) -> String {
    let with_names = rows.iter().any(|r| r.name.is_some());

    let mut headers = vec!["Climb #"];
    if with_names {
        headers.push("Name");
    }
    headers.extend([
        "Start (km)",
        "End (km)",
        "Distance (km)",
        "Elevation Gain (m)",
        "Avg Gradient (%)",
        "Category",
    ]);

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            let mut row = vec![r.number.to_string()];
            if with_names {
                row.push(r.name.clone().unwrap_or_default());
            }
            row.extend([
                r.start_km.clone(),
                r.end_km.clone(),
                r.distance_km.clone(),
                r.elevation_gain_m.clone(),
                r.avg_gradient_pct.clone(),
                r.category.clone(),
            ]);
            row
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, h)| {
            cells
                .iter()
                .map(|row| row[col].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = w))
        .collect();
    let _ = writeln!(out, "{}", header_line.join("  ").trim_end());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(col, (cell, w))| {
                // Text columns left-aligned, numbers right-aligned
                let is_text = headers[col] == "Name" || headers[col] == "Category";
                if is_text {
                    format!("{:<w$}", cell, w = w)
                } else {
                    format!("{:>w$}", cell, w = w)
                }
            })
            .collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
    }
    out
}

/// Human-readable route totals.
pub fn format_summary(summary: &RouteSummary) -> String {
    format!(
        "Distance: {:.2} km\nElevation gain: {:.0} m\nMax elevation: {:.0} m\nMin elevation: {:.0} m\n",
        summary.total_distance_km,
        summary.elevation_gain_m,
        summary.max_elevation_m,
        summary.min_elevation_m
    )
}

/// Everything a presentation layer needs for one route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteReport {
    pub title: String,
    pub summary: RouteSummary,
    pub climbs: Vec<Climb>,
    /// Display names keyed by 0-based climb position
    #[serde(default)]
    pub names: BTreeMap<usize, String>,
}

impl RouteReport {
    pub fn new(summary: RouteSummary, climbs: Vec<Climb>) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            summary,
            climbs,
            names: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_names(mut self, names: BTreeMap<usize, String>) -> Self {
        self.names = names;
        self
    }

    pub fn table(&self) -> Vec<ClimbTableRow> {
        climb_table(&self.climbs, &self.names)
    }

    /// Pretty JSON with the raw climbs and the formatted table.
    pub fn to_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Export<'a> {
            #[serde(flatten)]
            report: &'a RouteReport,
            table: Vec<ClimbTableRow>,
        }
        Ok(serde_json::to_string_pretty(&Export {
            report: self,
            table: self.table(),
        })?)
    }
}
