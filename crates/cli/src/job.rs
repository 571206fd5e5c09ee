//! Job loading: parts lists (CSV or JSON) and board/trim arguments.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use u_panelcut_core::{Mm, PartRequest, Trim};

/// Parts and optional overrides read from an input file.
#[derive(Debug, Clone, Default)]
pub struct Job {
    pub parts: Vec<PartRequest>,
    pub board: Option<(Mm, Mm)>,
    pub kerf: Option<Mm>,
    pub trim: Option<Trim>,
}

#[derive(Debug, Deserialize)]
struct JobFile {
    #[serde(default)]
    panels: Vec<PanelEntry>,
    #[serde(default)]
    settings: Option<SettingsEntry>,
    items: Vec<ItemEntry>,
}

#[derive(Debug, Deserialize)]
struct PanelEntry {
    w: Mm,
    h: Mm,
}

#[derive(Debug, Deserialize)]
struct SettingsEntry {
    kerf: Option<Mm>,
    trim: Option<TrimEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TrimEntry {
    Uniform(Mm),
    Sides([Mm; 4]),
}

#[derive(Debug, Deserialize)]
struct ItemEntry {
    #[serde(alias = "id")]
    name: String,
    w: Mm,
    h: Mm,
    #[serde(alias = "count", default = "one")]
    qty: usize,
    #[serde(default = "yes")]
    can_rotate: bool,
}

fn one() -> usize {
    1
}

fn yes() -> bool {
    true
}

impl TrimEntry {
    fn to_trim(&self) -> anyhow::Result<Trim> {
        let trim = match *self {
            Self::Uniform(m) => Trim::uniform(m)?,
            Self::Sides([l, r, t, b]) => Trim::new(l, r, t, b)?,
        };
        Ok(trim)
    }
}

/// Loads a job from `.json` or `.csv` (by extension).
pub fn load_job(path: &Path) -> anyhow::Result<Job> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        parse_json_job(&text)
    } else {
        Ok(Job {
            parts: parse_parts_csv(&text)?,
            ..Job::default()
        })
    }
}

/// Parses the JSON job layout (`panels`, `settings`, `items`).
pub fn parse_json_job(text: &str) -> anyhow::Result<Job> {
    let file: JobFile = serde_json::from_str(text).context("parsing job JSON")?;
    let parts = file
        .items
        .into_iter()
        .map(|item| {
            PartRequest::new(item.name, item.w, item.h, item.qty)
                .map(|p| p.with_rotation(item.can_rotate))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let (kerf, trim) = match file.settings {
        Some(settings) => (
            settings.kerf,
            settings.trim.as_ref().map(TrimEntry::to_trim).transpose()?,
        ),
        None => (None, None),
    };
    Ok(Job {
        parts,
        board: file.panels.first().map(|p| (p.w, p.h)),
        kerf,
        trim,
    })
}

/// Parses `name,w,h,qty,can_rotate` rows. A header row and blank or `#` lines
/// are skipped; `qty` defaults to 1 and `can_rotate` to true.
pub fn parse_parts_csv(text: &str) -> anyhow::Result<Vec<PartRequest>> {
    let mut parts = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if lineno == 0 && fields.first().map_or(false, |f| f.eq_ignore_ascii_case("name")) {
            continue;
        }
        if fields.len() < 3 {
            bail!("line {}: expected name,w,h[,qty[,can_rotate]]", lineno + 1);
        }
        let w: Mm = fields[1]
            .parse()
            .with_context(|| format!("line {}: bad width '{}'", lineno + 1, fields[1]))?;
        let h: Mm = fields[2]
            .parse()
            .with_context(|| format!("line {}: bad height '{}'", lineno + 1, fields[2]))?;
        let qty = match fields.get(3) {
            Some(q) if !q.is_empty() => q
                .parse()
                .with_context(|| format!("line {}: bad qty '{}'", lineno + 1, q))?,
            _ => 1,
        };
        let can_rotate = match fields.get(4) {
            Some(v) if !v.is_empty() => parse_bool(v)
                .with_context(|| format!("line {}: bad can_rotate '{}'", lineno + 1, v))?,
            _ => true,
        };
        parts.push(PartRequest::new(fields[0], w, h, qty)?.with_rotation(can_rotate));
    }
    if parts.is_empty() {
        bail!("no parts found");
    }
    Ok(parts)
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        _ => bail!("expected true/false"),
    }
}

/// Parses `WxH`.
pub fn parse_board(value: &str) -> anyhow::Result<(Mm, Mm)> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .with_context(|| format!("board '{}' must look like 2800x2070", value))?;
    Ok((w.trim().parse()?, h.trim().parse()?))
}

/// Parses `N` or `L,R,T,B`.
pub fn parse_trim(value: &str) -> anyhow::Result<Trim> {
    let sides = value
        .split(',')
        .map(|s| s.trim().parse::<Mm>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("trim '{}' must be N or L,R,T,B", value))?;
    let trim = match sides.as_slice() {
        [m] => Trim::uniform(*m)?,
        [l, r, t, b] => Trim::new(*l, *r, *t, *b)?,
        _ => bail!("trim '{}' must be N or L,R,T,B", value),
    };
    Ok(trim)
}

/// Renders parts back to the CSV layout read by [`parse_parts_csv`].
pub fn parts_to_csv(parts: &[PartRequest]) -> String {
    let mut out = String::from("name,w,h,qty,can_rotate\n");
    for p in parts {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            p.name(),
            p.w(),
            p.h(),
            p.qty(),
            p.can_rotate()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_with_header_and_defaults() {
        let text = "name,w,h,qty,can_rotate\nside,2400,560,2,false\n# comment\n\nshelf,560,500\n";
        let parts = parse_parts_csv(text).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].qty(), 2);
        assert!(!parts[0].can_rotate());
        assert_eq!(parts[1].qty(), 1);
        assert!(parts[1].can_rotate());
    }

    #[test]
    fn test_parse_csv_rejects_zero_qty() {
        assert!(parse_parts_csv("door,500,700,0,1\n").is_err());
        assert!(parse_parts_csv("door,abc,700\n").is_err());
        assert!(parse_parts_csv("name,w,h\n").is_err());
    }

    #[test]
    fn test_parse_json_job() {
        let text = r#"{
            "panels": [{"w": 2800, "h": 2070}],
            "settings": {"kerf": 4, "trim": [10, 10, 5, 5]},
            "items": [
                {"id": "door", "w": 500, "h": 700, "count": 2, "can_rotate": false},
                {"name": "shelf", "w": 560, "h": 500}
            ]
        }"#;
        let job = parse_json_job(text).unwrap();
        assert_eq!(job.board, Some((2800, 2070)));
        assert_eq!(job.kerf, Some(4));
        assert_eq!(job.trim.unwrap().top, 5);
        assert_eq!(job.parts.len(), 2);
        assert_eq!(job.parts[0].qty(), 2);
        assert!(job.parts[1].can_rotate());
    }

    #[test]
    fn test_parse_board_and_trim() {
        assert_eq!(parse_board("2800x2070").unwrap(), (2800, 2070));
        assert!(parse_board("2800").is_err());
        assert_eq!(parse_trim("10").unwrap(), Trim::uniform(10).unwrap());
        assert_eq!(parse_trim("1,2,3,4").unwrap().bottom, 4);
        assert!(parse_trim("1,2").is_err());
    }

    #[test]
    fn test_csv_round_trip_of_generated_parts() {
        let parts = vec![PartRequest::new("a", 100, 200, 3).unwrap().with_rotation(false)];
        let back = parse_parts_csv(&parts_to_csv(&parts)).unwrap();
        assert_eq!(back, parts);
    }
}
