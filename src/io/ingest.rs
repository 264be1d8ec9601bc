//! CSV ingest for contribution functions and observed line intensities.
//!
//! Two inputs:
//! - a contribution-function table: a `temperature` column (K) plus one
//!   column per line (cm^5 K^-1)
//! - a line-intensity table: `line,intensity,error`
//!
//! Header names are matched case-insensitively after trimming and stripping
//! a UTF-8 BOM. Line names are kept as written.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use csv::StringRecord;
use log::{debug, warn};

use crate::emission::{ContFuncDiscrete, EmissionLine, LineCollection};
use crate::error::AppError;

/// One observed line intensity.
#[derive(Debug, Clone, PartialEq)]
pub struct LineIntensity {
    pub line: String,
    pub intensity: f64,
    pub error: f64,
}

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Intensity ingest output: usable rows plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedIntensities {
    pub intensities: Vec<LineIntensity>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a contribution-function table, keyed by line name.
///
/// Every row must parse; a hole in the temperature grid would silently
/// change the bin averages.
pub fn load_cont_funcs(path: &Path) -> Result<BTreeMap<String, ContFuncDiscrete>, AppError> {
    let (headers, mut reader) = open_csv(path)?;
    let header_map = build_header_map(&headers);
    let temp_idx = *header_map
        .get("temperature")
        .ok_or_else(|| AppError::invalid("Missing required column: `temperature`"))?;

    let line_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != temp_idx)
        .map(|(idx, name)| (idx, clean_header(name).to_string()))
        .collect();
    if line_columns.is_empty() {
        return Err(AppError::invalid(
            "Contribution function CSV has no line columns besides `temperature`.",
        ));
    }
    if let Some((idx, _)) = line_columns.iter().find(|(_, n)| n.is_empty()) {
        return Err(AppError::invalid(format!("Empty line name in header column {}.", idx + 1)));
    }

    let mut temps = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); line_columns.len()];

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::invalid(format!("CSV parse error on line {line}: {e}")))?;

        let t = parse_field(&record, temp_idx)
            .ok_or_else(|| AppError::invalid(format!("Missing/invalid `temperature` on line {line}.")))?;
        temps.push(t);

        for ((col, name), values) in line_columns.iter().zip(columns.iter_mut()) {
            let v = parse_field(&record, *col)
                .ok_or_else(|| AppError::invalid(format!("Missing/invalid value for `{name}` on line {line}.")))?;
            values.push(v);
        }
    }

    let mut out = BTreeMap::new();
    for ((_, name), values) in line_columns.into_iter().zip(columns) {
        let cont_func = ContFuncDiscrete::new(temps.clone(), values)
            .map_err(|e| AppError::invalid(format!("Line `{name}`: {e}")))?;
        if out.insert(name.clone(), cont_func).is_some() {
            return Err(AppError::invalid(format!("Duplicate line column: `{name}`")));
        }
    }

    debug!(
        "loaded {} contribution functions on {} temperatures from '{}'",
        out.len(),
        temps.len(),
        path.display()
    );
    Ok(out)
}

/// Load observed intensities, skipping rows that do not parse.
pub fn load_line_intensities(path: &Path) -> Result<IngestedIntensities, AppError> {
    let (headers, mut reader) = open_csv(path)?;
    let header_map = build_header_map(&headers);
    for name in ["line", "intensity", "error"] {
        if !header_map.contains_key(name) {
            return Err(AppError::invalid(format!("Missing required column: `{name}`")));
        }
    }

    let mut intensities = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_intensity_row(&record, &header_map) {
            Ok(row) => intensities.push(row),
            Err(message) => row_errors.push(RowError {
                line,
                id: get_optional(&record, &header_map, "line").map(str::to_string),
                message,
            }),
        }
    }

    for err in &row_errors {
        warn!(
            "skipping line {} of '{}'{}: {}",
            err.line,
            path.display(),
            err.id.as_deref().map(|id| format!(" ({id})")).unwrap_or_default(),
            err.message
        );
    }

    if intensities.is_empty() {
        return Err(AppError::data(format!(
            "No valid line intensities in '{}'.",
            path.display()
        )));
    }

    Ok(IngestedIntensities {
        intensities,
        row_errors,
        rows_read,
    })
}

/// Join intensities to contribution functions by line name.
///
/// Names match exactly first, then ignoring ASCII case.
pub fn assemble_lines(
    intensities: &[LineIntensity],
    cont_funcs: &BTreeMap<String, ContFuncDiscrete>,
) -> Result<LineCollection, AppError> {
    let mut missing = Vec::new();
    let mut lines = Vec::with_capacity(intensities.len());

    for obs in intensities {
        let found = cont_funcs.get(&obs.line).or_else(|| {
            cont_funcs
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&obs.line))
                .map(|(_, cf)| cf)
        });
        match found {
            Some(cf) => lines.push(
                EmissionLine::new(Arc::new(cf.clone()))
                    .named(obs.line.clone())
                    .with_observation(obs.intensity, obs.error),
            ),
            None => missing.push(obs.line.as_str()),
        }
    }

    if !missing.is_empty() {
        return Err(AppError::data(format!(
            "No contribution function for line(s): {}",
            missing.join(", ")
        )));
    }
    Ok(LineCollection::new(lines))
}

fn open_csv(path: &Path) -> Result<(StringRecord, csv::Reader<File>), AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::invalid(format!("Failed to read CSV headers: {e}")))?
        .clone();
    Ok((headers, reader))
}

fn parse_intensity_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<LineIntensity, String> {
    let line = get_optional(record, header_map, "line")
        .ok_or_else(|| "Missing `line` value.".to_string())?
        .to_string();
    let intensity = parse_opt_f64(get_optional(record, header_map, "intensity"))
        .ok_or_else(|| "Missing/invalid `intensity` value.".to_string())?;
    let error = parse_opt_f64(get_optional(record, header_map, "error"))
        .ok_or_else(|| "Missing/invalid `error` value.".to_string())?;
    if error <= 0.0 {
        return Err("Invalid `error` (must be > 0).".to_string());
    }
    Ok(LineIntensity { line, intensity, error })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (clean_header(name).to_ascii_lowercase(), idx))
        .collect()
}

fn clean_header(name: &str) -> &str {
    // Spreadsheet exports often put a BOM in front of the first header.
    name.trim().trim_start_matches('\u{feff}')
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_field(record: &StringRecord, idx: usize) -> Option<f64> {
    parse_opt_f64(record.get(idx).map(str::trim).filter(|s| !s.is_empty()))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let v = s?.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_cont_func_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "cf.csv",
            "\u{feff}Temperature, Fe XII 195 ,Fe XIII 202\n1e6,0.1,0.0\n2e6,0.3,0.2\n3e6,0.5,0.4\n",
        );
        let cfs = load_cont_funcs(&path).unwrap();
        assert_eq!(cfs.len(), 2);
        let fe12 = &cfs["Fe XII 195"];
        assert_eq!(fe12.temps(), &[1e6, 2e6, 3e6]);
        assert_eq!(fe12.values(), &[0.1, 0.3, 0.5]);
        assert_eq!(cfs["Fe XIII 202"].values(), &[0.0, 0.2, 0.4]);
    }

    #[test]
    fn cont_func_table_requires_temperature_and_clean_rows() {
        let dir = tempfile::tempdir().unwrap();
        let no_temp = write_file(&dir, "a.csv", "t,fe\n1,2\n2,3\n");
        assert_eq!(load_cont_funcs(&no_temp).unwrap_err().exit_code(), 2);

        let hole = write_file(&dir, "b.csv", "temperature,fe\n1,2\n2,\n3,4\n");
        let err = load_cont_funcs(&hole).unwrap_err();
        assert!(err.message().contains("line 3"), "{}", err.message());

        let unsorted = write_file(&dir, "c.csv", "temperature,fe\n2,2\n1,3\n");
        assert!(load_cont_funcs(&unsorted).is_err());
    }

    #[test]
    fn loads_intensities_and_skips_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "obs.csv",
            "LINE,Intensity,Error\nfe12,100,10\nfe13,oops,1\nfe14,50,0\nfe15,20,2\n",
        );
        let data = load_line_intensities(&path).unwrap();
        assert_eq!(data.rows_read, 4);
        assert_eq!(data.intensities.len(), 2);
        assert_eq!(data.intensities[1], LineIntensity {
            line: "fe15".to_string(),
            intensity: 20.0,
            error: 2.0,
        });
        assert_eq!(data.row_errors.len(), 2);
        assert_eq!(data.row_errors[0].line, 3);
        assert_eq!(data.row_errors[0].id.as_deref(), Some("fe13"));
    }

    #[test]
    fn intensities_need_schema_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let no_error = write_file(&dir, "a.csv", "line,intensity\nfe,1\n");
        assert_eq!(load_line_intensities(&no_error).unwrap_err().exit_code(), 2);

        let empty = write_file(&dir, "b.csv", "line,intensity,error\n");
        assert_eq!(load_line_intensities(&empty).unwrap_err().exit_code(), 3);

        let missing = dir.path().join("missing.csv");
        assert_eq!(load_line_intensities(&missing).unwrap_err().exit_code(), 5);
    }

    #[test]
    fn assemble_matches_names_and_reports_missing() {
        let mut cfs = BTreeMap::new();
        cfs.insert(
            "Fe XII".to_string(),
            ContFuncDiscrete::new(vec![1.0, 2.0], vec![1.0, 1.0]).unwrap(),
        );
        let obs = vec![LineIntensity {
            line: "fe xii".to_string(),
            intensity: 3.0,
            error: 0.3,
        }];
        let lines = assemble_lines(&obs, &cfs).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.lines[0].name.as_deref(), Some("fe xii"));
        assert_eq!(lines.lines[0].intensity_obs, Some(3.0));

        let obs = vec![LineIntensity {
            line: "O VI".to_string(),
            intensity: 1.0,
            error: 0.1,
        }];
        let err = assemble_lines(&obs, &cfs).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains("O VI"));
    }
}
