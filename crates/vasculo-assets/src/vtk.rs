//! Legacy VTK text parser
//!
//! Single forward pass over the lines of a legacy `.vtk` file. Section headers
//! drive a small state machine; numeric lines feed whichever section is open.
//! The parser never fails: malformed tokens are dropped, mismatched cell
//! records are skipped and truncated sections keep what was read.

use glam::Vec3;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use vasculo_core::Aabb;

use crate::scalar::{ScalarField, ScalarRole};
use crate::ProgressSink;

/// Lines between progress reports
const PROGRESS_INTERVAL: usize = 1000;

/// Declared file encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Encoding {
    Ascii,
    Binary,
    #[default]
    Unknown,
}

/// File header information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VtkHeader {
    /// Version from the `# vtk DataFile Version x.y` line
    pub version: Option<String>,
    /// Free-form title line
    pub title: String,
    /// `ASCII` or `BINARY`
    pub encoding: Encoding,
    /// Dataset kind from the `DATASET` line (e.g. `POLYDATA`)
    pub dataset: Option<String>,
}

/// Connectivity record: the point indices of one polyline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub indices: Vec<u32>,
}

impl Cell {
    /// Consecutive index pairs of the polyline
    pub fn segments(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.indices.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

/// Counters describing how permissive the parse had to be
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Lines scanned
    pub lines: usize,
    /// Numeric tokens that failed to parse and were dropped
    pub dropped_tokens: usize,
    /// Cell records skipped because their count did not match their length
    pub skipped_cells: usize,
}

/// Parsed polydata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolyData {
    /// File header
    pub header: VtkHeader,
    /// Point count declared by the `POINTS` header
    pub point_count: usize,
    /// Point coordinates actually read
    pub points: Vec<Vec3>,
    /// Point scalars in file order, keyed by name
    pub scalars: IndexMap<String, ScalarField>,
    /// Polyline cells
    pub cells: Vec<Cell>,
    /// Parse diagnostics
    pub stats: ParseStats,
}

impl PolyData {
    /// Whether no points were read
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the point section ended before the declared count
    pub fn is_truncated(&self) -> bool {
        self.points.len() < self.point_count
    }

    /// First scalar field with the given role
    pub fn field(&self, role: ScalarRole) -> Option<&ScalarField> {
        self.scalars.values().find(|field| field.role() == role)
    }

    /// Radius field, if any
    pub fn radius(&self) -> Option<&ScalarField> {
        self.field(ScalarRole::Radius)
    }

    /// Pressure field, if any
    pub fn pressure(&self) -> Option<&ScalarField> {
        self.field(ScalarRole::Pressure)
    }

    /// Bounds of the parsed points
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.points)
    }

    /// Total number of consecutive index pairs across all cells
    pub fn segment_pair_count(&self) -> usize {
        self.cells.iter().map(|c| c.indices.len().saturating_sub(1)).sum()
    }
}

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    None,
    ReadingPoints,
    ReadingCells,
    ReadingScalarHeader,
    ReadingScalarValues,
    /// Inside a section whose data is not consumed (cell data, normals, ...)
    Skipping,
}

/// Which entities the current attribute block describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeTarget {
    Points(usize),
    Cells,
}

struct Parser {
    state: ParseState,
    data: PolyData,
    pending_coords: Vec<f32>,
    cells_remaining: usize,
    attributes: Option<AttributeTarget>,
    scalar: Option<ScalarField>,
    scalar_components: usize,
    scalar_raw: Vec<f32>,
}

impl Parser {
    fn new() -> Self {
        Self {
            state: ParseState::None,
            data: PolyData::default(),
            pending_coords: Vec::with_capacity(3),
            cells_remaining: 0,
            attributes: None,
            scalar: None,
            scalar_components: 1,
            scalar_raw: Vec::new(),
        }
    }

    fn line(&mut self, index: usize, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        if index == 0 && line.starts_with('#') {
            self.data.header.version = line
                .split_whitespace()
                .last()
                .filter(|v| v.chars().next().is_some_and(|c| c.is_ascii_digit()))
                .map(str::to_string);
            return;
        }

        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            return;
        };

        match keyword {
            "POINTS" => {
                self.finish_scalar();
                let count = parse_count(tokens.next());
                self.data.point_count = count;
                self.data.points.reserve(count);
                self.pending_coords.clear();
                self.state = if count > 0 { ParseState::ReadingPoints } else { ParseState::None };
            }
            "CELLS" | "POLYGONS" | "LINES" => {
                self.finish_scalar();
                self.cells_remaining = parse_count(tokens.next());
                self.data.cells.reserve(self.cells_remaining);
                self.state = if self.cells_remaining > 0 { ParseState::ReadingCells } else { ParseState::None };
            }
            "POINT_DATA" => {
                self.finish_scalar();
                self.attributes = Some(AttributeTarget::Points(parse_count(tokens.next())));
                self.state = ParseState::None;
            }
            "CELL_DATA" => {
                self.finish_scalar();
                self.attributes = Some(AttributeTarget::Cells);
                self.state = ParseState::Skipping;
            }
            "SCALARS" => {
                self.finish_scalar();
                if self.attributes == Some(AttributeTarget::Cells) {
                    self.state = ParseState::Skipping;
                    return;
                }
                let name = tokens.next().unwrap_or("scalars");
                let data_type = tokens.next().unwrap_or("float");
                self.scalar_components = tokens
                    .next()
                    .and_then(|t| t.parse::<usize>().ok())
                    .filter(|&n| n > 0)
                    .unwrap_or(1);
                self.scalar = Some(ScalarField::new(name, data_type));
                self.scalar_raw.clear();
                self.state = ParseState::ReadingScalarHeader;
            }
            "LOOKUP_TABLE" => {
                if self.state == ParseState::ReadingScalarHeader {
                    self.state = ParseState::ReadingScalarValues;
                } else {
                    // Standalone color table definition
                    self.finish_scalar();
                    self.state = ParseState::Skipping;
                }
            }
            "DATASET" => {
                self.data.header.dataset = tokens.next().map(str::to_string);
                self.state = ParseState::None;
            }
            "ASCII" => self.data.header.encoding = Encoding::Ascii,
            "BINARY" => self.data.header.encoding = Encoding::Binary,
            "VERTICES" | "TRIANGLE_STRIPS" | "CELL_TYPES" | "FIELD" | "NORMALS" | "VECTORS"
            | "TENSORS" | "COLOR_SCALARS" | "TEXTURE_COORDINATES" | "METADATA" => {
                self.finish_scalar();
                self.state = ParseState::Skipping;
            }
            _ => {
                if index == 1 && self.data.header.title.is_empty() && self.state == ParseState::None {
                    self.data.header.title = line.to_string();
                    return;
                }
                self.data_line(line);
            }
        }
    }

    fn data_line(&mut self, line: &str) {
        match self.state {
            ParseState::ReadingPoints => self.point_line(line),
            ParseState::ReadingCells => self.cell_line(line),
            ParseState::ReadingScalarHeader => {
                // Values without a LOOKUP_TABLE line
                self.state = ParseState::ReadingScalarValues;
                self.scalar_line(line);
            }
            ParseState::ReadingScalarValues => self.scalar_line(line),
            ParseState::None | ParseState::Skipping => {}
        }
    }

    fn point_line(&mut self, line: &str) {
        for value in self.floats(line) {
            self.pending_coords.push(value);
            if self.pending_coords.len() == 3 {
                let c = &self.pending_coords;
                self.data.points.push(Vec3::new(c[0], c[1], c[2]));
                self.pending_coords.clear();

                if self.data.points.len() >= self.data.point_count {
                    self.state = ParseState::None;
                    return;
                }
            }
        }
    }

    fn cell_line(&mut self, line: &str) {
        let mut values = Vec::new();
        for token in line.split_whitespace() {
            match token.parse::<u32>() {
                Ok(v) => values.push(v),
                Err(_) => self.data.stats.dropped_tokens += 1,
            }
        }

        self.cells_remaining = self.cells_remaining.saturating_sub(1);
        if self.cells_remaining == 0 {
            self.state = ParseState::None;
        }

        match values.split_first() {
            Some((&count, indices)) if indices.len() == count as usize => {
                self.data.cells.push(Cell { indices: indices.to_vec() });
            }
            _ => self.data.stats.skipped_cells += 1,
        }
    }

    fn scalar_line(&mut self, line: &str) {
        let expected = self.scalar_target() * self.scalar_components;
        let values = self.floats(line);
        for value in values {
            if self.scalar_raw.len() >= expected {
                break;
            }
            self.scalar_raw.push(value);
        }

        if self.scalar_raw.len() >= expected {
            self.finish_scalar();
            self.state = ParseState::None;
        }
    }

    fn scalar_target(&self) -> usize {
        match self.attributes {
            Some(AttributeTarget::Points(n)) => n,
            _ => self.data.point_count,
        }
    }

    fn floats(&mut self, line: &str) -> Vec<f32> {
        let mut out = Vec::new();
        for token in line.split_whitespace() {
            match token.parse::<f32>() {
                Ok(v) => out.push(v),
                Err(_) => self.data.stats.dropped_tokens += 1,
            }
        }
        out
    }

    fn finish_scalar(&mut self) {
        let Some(mut field) = self.scalar.take() else {
            return;
        };

        let components = self.scalar_components.max(1);
        field.values = self.scalar_raw.iter().step_by(components).copied().collect();
        self.scalar_raw.clear();
        self.scalar_components = 1;

        if field.is_empty() {
            log::debug!("Scalar field '{}' has no values, dropping it", field.name);
            return;
        }
        if field.len() < self.scalar_target() {
            log::warn!(
                "Scalar field '{}' truncated: {} of {} values",
                field.name,
                field.len(),
                self.scalar_target()
            );
        }
        self.data.scalars.insert(field.name.clone(), field);
    }

    fn finish(mut self) -> PolyData {
        self.finish_scalar();
        self.data
    }
}

fn parse_count(token: Option<&str>) -> usize {
    token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0)
}

/// Parse legacy VTK text, reporting progress every 1000 lines
pub fn parse(text: &str, progress: &mut impl ProgressSink) -> PolyData {
    let total_lines = text.lines().count().max(1);
    let mut parser = Parser::new();

    for (index, line) in text.lines().enumerate() {
        if index % PROGRESS_INTERVAL == 0 {
            progress.report("Parsing VTK data", index as f32 / total_lines as f32 * 100.0);
        }
        parser.line(index, line);
    }

    let mut data = parser.finish();
    data.stats.lines = total_lines;

    if data.is_truncated() {
        log::warn!(
            "POINTS section truncated: {} of {} points read",
            data.points.len(),
            data.point_count
        );
    }
    log::debug!(
        "Parsed {} points, {} cells ({} skipped), {} scalar fields",
        data.points.len(),
        data.cells.len(),
        data.stats.skipped_cells,
        data.scalars.len()
    );

    data
}

/// Parse legacy VTK text without progress reporting
pub fn parse_str(text: &str) -> PolyData {
    parse(text, &mut crate::no_progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = "# vtk DataFile Version 3.0
Vascular tree
ASCII
DATASET POLYDATA
POINTS 4 float
0 0 0  1 0 0
2 0 0
3 1 0
LINES 2 7
3 0 1 2
2 2 3
POINT_DATA 4
SCALARS radius float
LOOKUP_TABLE default
0.5 0.4 0.3 0.2
SCALARS pressure double 1
LOOKUP_TABLE default
100
90
80
70
";

    #[test]
    fn test_header() {
        let data = parse_str(TREE);
        assert_eq!(data.header.version.as_deref(), Some("3.0"));
        assert_eq!(data.header.title, "Vascular tree");
        assert_eq!(data.header.encoding, Encoding::Ascii);
        assert_eq!(data.header.dataset.as_deref(), Some("POLYDATA"));
    }

    #[test]
    fn test_points_with_free_wrapping() {
        let data = parse_str(TREE);
        assert_eq!(data.point_count, 4);
        assert_eq!(data.points.len(), 4);
        assert_eq!(data.points[1], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(data.points[3], Vec3::new(3.0, 1.0, 0.0));
    }

    #[test]
    fn test_point_count_ignores_trailing_values() {
        let text = "POINTS 3 float\n0 0 0\n1 1 1\n2 2 2\n3 3 3\n4 4 4\n";
        let data = parse_str(text);
        assert_eq!(data.points.len(), 3);
        assert_eq!(data.points[2], Vec3::splat(2.0));
    }

    #[test]
    fn test_cells_and_scalars() {
        let data = parse_str(TREE);
        assert_eq!(data.cells.len(), 2);
        assert_eq!(data.cells[0].indices, vec![0, 1, 2]);
        assert_eq!(data.segment_pair_count(), 3);

        let radius = data.radius().unwrap();
        assert_eq!(radius.values, vec![0.5, 0.4, 0.3, 0.2]);
        let pressure = data.pressure().unwrap();
        assert_eq!(pressure.values, vec![100.0, 90.0, 80.0, 70.0]);
        assert_eq!(pressure.data_type, "double");
    }

    #[test]
    fn test_mismatched_cell_record_skipped() {
        let text = "POINTS 3 float\n0 0 0 1 0 0 2 0 0\nLINES 2 7\n3 0 1\n3 0 1 2\n";
        let data = parse_str(text);
        assert_eq!(data.cells.len(), 1);
        assert_eq!(data.cells[0].indices, vec![0, 1, 2]);
        assert_eq!(data.stats.skipped_cells, 1);
    }

    #[test]
    fn test_polygons_keyword() {
        let text = "POINTS 3 float\n0 0 0 1 0 0 2 0 0\nPOLYGONS 1 4\n3 0 1 2\n";
        let data = parse_str(text);
        assert_eq!(data.cells.len(), 1);
    }

    #[test]
    fn test_malformed_tokens_dropped() {
        let text = "POINTS 2 float\n0 0 abc 0\n1 1 1\n";
        let data = parse_str(text);
        assert_eq!(data.points.len(), 2);
        assert_eq!(data.stats.dropped_tokens, 1);
    }

    #[test]
    fn test_truncated_points_degrade() {
        let text = "POINTS 5 float\n0 0 0\n1 1 1\n";
        let data = parse_str(text);
        assert_eq!(data.point_count, 5);
        assert_eq!(data.points.len(), 2);
        assert!(data.is_truncated());
    }

    #[test]
    fn test_cell_data_scalars_ignored() {
        let text = "POINTS 2 float\n0 0 0 1 1 1\nLINES 1 3\n2 0 1\n\
                    CELL_DATA 1\nSCALARS pressure float\nLOOKUP_TABLE default\n5\n\
                    POINT_DATA 2\nSCALARS radius float\nLOOKUP_TABLE default\n0.2 0.3\n";
        let data = parse_str(text);
        assert!(data.pressure().is_none());
        assert_eq!(data.radius().unwrap().values, vec![0.2, 0.3]);
    }

    #[test]
    fn test_cell_types_section_not_read_as_cells() {
        let text = "POINTS 2 float\n0 0 0 1 1 1\nCELLS 1 3\n2 0 1\nCELL_TYPES 1\n4\n";
        let data = parse_str(text);
        assert_eq!(data.cells.len(), 1);
        assert_eq!(data.stats.skipped_cells, 0);
    }

    #[test]
    fn test_multi_component_scalars_keep_first_component() {
        let text = "POINTS 2 float\n0 0 0 1 1 1\nPOINT_DATA 2\nSCALARS radius float 2\nLOOKUP_TABLE default\n0.1 9 0.2 9\n";
        let data = parse_str(text);
        assert_eq!(data.radius().unwrap().values, vec![0.1, 0.2]);
    }

    #[test]
    fn test_missing_sections() {
        let data = parse_str("nothing to see here\n");
        assert!(data.is_empty());
        assert!(data.cells.is_empty());
        assert!(data.scalars.is_empty());
    }

    #[test]
    fn test_progress_reported_every_thousand_lines() {
        let mut text = String::from("POINTS 2500 float\n");
        for i in 0..2500 {
            text.push_str(&format!("{i} 0 0\n"));
        }

        let mut reports = Vec::new();
        let data = parse(&text, &mut |_: &str, percent: f32| reports.push(percent));

        assert_eq!(data.points.len(), 2500);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0], 0.0);
        assert!(reports.windows(2).all(|w| w[0] < w[1]));
    }
}
