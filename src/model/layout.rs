use serde::{Deserialize, Serialize};

use crate::sys::geometry::Rect;

fn one() -> u32 { 1 }

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayoutZone {
    /// Authoritative rectangle, in pixels from the reference screen's origin.
    pub bounds: Rect,
    pub column: u32,
    pub row: u32,
    #[serde(default = "one")]
    pub column_span: u32,
    #[serde(default = "one")]
    pub row_span: u32,
}

impl LayoutZone {
    pub fn new(bounds: Rect, column: u32, row: u32) -> Self {
        LayoutZone {
            bounds,
            column,
            row,
            column_span: 1,
            row_span: 1,
        }
    }
}

/// A named set of zones plus the bounds of the area it was authored against.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Layout {
    pub name: String,
    pub bounds: Rect,
    #[serde(default)]
    pub zones: Vec<LayoutZone>,
}

impl Layout {
    pub fn new(name: impl Into<String>, bounds: Rect, zones: Vec<LayoutZone>) -> Self {
        Layout { name: name.into(), bounds, zones }
    }

    /// Splits `area` into an evenly sized grid, zones in row-major order.
    ///
    /// Zone bounds are taken relative to `screen`'s origin.
    pub fn grid(
        name: impl Into<String>,
        area: Rect,
        screen: Rect,
        columns: u32,
        rows: u32,
    ) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let origin = area.translate(-screen.left, -screen.top);
        let width = area.width / columns as f64;
        let height = area.height / rows as f64;
        let zones = (0..rows)
            .flat_map(|row| (0..columns).map(move |column| (column, row)))
            .map(|(column, row)| {
                let bounds = Rect::new(
                    origin.left + width * column as f64,
                    origin.top + height * row as f64,
                    width,
                    height,
                );
                LayoutZone::new(bounds, column, row)
            })
            .collect();
        Layout::new(name, area, zones)
    }

    /// Zones in order, minus the degenerate ones.
    pub fn applicable_zones(&self) -> impl Iterator<Item = &LayoutZone> {
        self.zones.iter().filter(|z| !z.bounds.is_degenerate())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.name.trim().is_empty() {
            issues.push("layout name must not be empty".to_string());
        }
        check_rect(&mut issues, "layout bounds", &self.bounds);
        for (i, zone) in self.zones.iter().enumerate() {
            check_rect(&mut issues, &format!("zone {i} bounds"), &zone.bounds);
            if zone.column_span < 1 || zone.row_span < 1 {
                issues.push(format!(
                    "zone {i} spans must be at least 1 (got {}x{})",
                    zone.column_span, zone.row_span
                ));
            }
        }
        issues
    }
}

fn check_rect(issues: &mut Vec<String>, what: &str, r: &Rect) {
    if !r.is_finite() {
        issues.push(format!("{what} must be finite numbers"));
    } else if r.width < 0.0 || r.height < 0.0 {
        issues.push(format!("{what} has a negative size ({}x{})", r.width, r.height));
    }
}
