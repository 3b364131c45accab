use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::orbit::{ChecksumPolicy, ElementsError, OrbitalElements};
use crate::predict::error::PredictError;

/// An element set that was found in a catalog but could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedSet {
    pub file: String,
    pub name: Option<String>,
    pub error: ElementsError,
}

pub struct TleLoader {
    tle_dir: PathBuf,
    policy: ChecksumPolicy,
    satellites: HashMap<u32, OrbitalElements>,
    rejected: Vec<RejectedSet>,
}

impl TleLoader {
    pub fn new(tle_dir: PathBuf, policy: ChecksumPolicy) -> Self {
        Self {
            tle_dir,
            policy,
            satellites: HashMap::new(),
            rejected: Vec::new(),
        }
    }

    /// Load all `.tle` and `.txt` files from the directory. Later files
    /// replace earlier entries with the same catalog number.
    pub fn load_all(&mut self) -> Result<(), PredictError> {
        if !self.tle_dir.is_dir() {
            return Err(PredictError::DirectoryNotFound(
                self.tle_dir.display().to_string(),
            ));
        }

        self.satellites.clear();
        self.rejected.clear();

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.tle_dir)? {
            let path = entry?.path();
            let is_catalog = path
                .extension()
                .is_some_and(|ext| ext == "tle" || ext == "txt");
            if path.is_file() && is_catalog {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            if let Err(e) = self.load_file(&path) {
                log::warn!("Failed to read TLE file {}: {}", path.display(), e);
            }
        }

        log::info!(
            "Loaded {} satellites from {} ({} rejected)",
            self.satellites.len(),
            self.tle_dir.display(),
            self.rejected.len()
        );
        Ok(())
    }

    fn load_file(&mut self, path: &Path) -> Result<(), PredictError> {
        let content = fs::read_to_string(path)?;
        let file = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let (loaded, rejected) = parse_catalog_text(&content, &file, self.policy);
        for elements in loaded {
            self.satellites.insert(elements.catalog_number, elements);
        }
        self.rejected.extend(rejected);
        Ok(())
    }

    /// Loaded satellites ordered by catalog number.
    pub fn satellites(&self) -> Vec<&OrbitalElements> {
        let mut satellites: Vec<_> = self.satellites.values().collect();
        satellites.sort_by_key(|s| s.catalog_number);
        satellites
    }

    pub fn get(&self, catalog_number: u32) -> Option<&OrbitalElements> {
        self.satellites.get(&catalog_number)
    }

    /// Look up by catalog number or by case-insensitive name.
    pub fn find(&self, query: &str) -> Option<&OrbitalElements> {
        if let Ok(number) = query.trim().parse::<u32>() {
            return self.get(number);
        }
        self.satellites()
            .into_iter()
            .find(|s| s.id.eq_ignore_ascii_case(query.trim()))
    }

    pub fn rejected(&self) -> &[RejectedSet] {
        &self.rejected
    }

    pub fn reload(&mut self) -> Result<(), PredictError> {
        self.load_all()
    }
}

/// Decode every element set in a catalog text. A malformed set is logged and
/// reported without affecting the others.
pub fn parse_catalog_text(
    content: &str,
    file: &str,
    policy: ChecksumPolicy,
) -> (Vec<OrbitalElements>, Vec<RejectedSet>) {
    let mut loaded = Vec::new();
    let mut rejected = Vec::new();

    for (name, line1, line2) in split_sets(content) {
        match OrbitalElements::parse_with(name, line1, line2, policy) {
            Ok(elements) => loaded.push(elements),
            Err(error) => {
                log::warn!(
                    "{}: skipping {}: {}",
                    file,
                    name.unwrap_or(line1.get(2..7).unwrap_or(line1)),
                    error
                );
                rejected.push(RejectedSet {
                    file: file.to_string(),
                    name: name.map(str::to_string),
                    error,
                });
            }
        }
    }

    (loaded, rejected)
}

/// Group catalog lines into 2-line and 3-line sets. Lines that fit neither
/// shape are skipped.
fn split_sets(content: &str) -> Vec<(Option<&str>, &str, &str)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut sets = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let rest = &lines[i..];
        match rest {
            [l1, l2, ..] if l1.starts_with("1 ") && l2.starts_with("2 ") => {
                sets.push((None, *l1, *l2));
                i += 2;
            }
            [name, l1, l2, ..] if l1.starts_with("1 ") && l2.starts_with("2 ") => {
                sets.push((Some(*name), *l1, *l2));
                i += 3;
            }
            _ => {
                log::debug!("Skipping stray catalog line {:?}", rest[0]);
                i += 1;
            }
        }
    }

    sets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ISS_1: &str =
        "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_2: &str =
        "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";
    const ISS_2_BAD: &str =
        "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563538";
    const PUBLISHED_1: &str =
        "1 25544U 98067A   25001.00000000  .00002182  00000-0  40864-4 0  9990";
    const PUBLISHED_2: &str =
        "2 25544  51.6461 339.2971 0002829  68.6102 291.5211 15.48919103123456";

    fn write(dir: &Path, name: &str, content: &str) {
        let mut file = fs::File::create(dir.join(name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn splits_two_and_three_line_sets() {
        let text = format!(
            "ISS (ZARYA)\n{ISS_1}\n{ISS_2}\n\n{PUBLISHED_1}\n{PUBLISHED_2}\ngarbage\n"
        );
        let sets = split_sets(&text);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].0, Some("ISS (ZARYA)"));
        assert_eq!(sets[1].0, None);
        assert_eq!(sets[1].1, PUBLISHED_1);
    }

    #[test]
    fn malformed_set_only_affects_itself() {
        let text = format!("GOOD\n{ISS_1}\n{ISS_2}\nBAD\n{ISS_1}\n{ISS_2_BAD}\n");
        let (loaded, rejected) = parse_catalog_text(&text, "mixed.tle", ChecksumPolicy::Enforce);

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "GOOD");
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].name.as_deref(), Some("BAD"));
        assert!(matches!(
            rejected[0].error,
            ElementsError::BadChecksum { line: 2, .. }
        ));
    }

    #[test]
    fn repair_policy_accepts_bad_checksums() {
        let text = format!("{PUBLISHED_1}\n{PUBLISHED_2}\n");
        let (loaded, rejected) = parse_catalog_text(&text, "iss.txt", ChecksumPolicy::Repair);
        assert!(rejected.is_empty());
        assert_eq!(loaded[0].id, "NORAD 25544");
    }

    #[test]
    fn loads_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "stations.tle", &format!("0 ISS (ZARYA)\n{ISS_1}\n{ISS_2}\n"));
        write(dir.path(), "broken.txt", &format!("{PUBLISHED_1}\n{PUBLISHED_2}\n"));
        write(dir.path(), "notes.md", &format!("{ISS_1}\n{ISS_2}\n"));

        let mut loader = TleLoader::new(dir.path().to_path_buf(), ChecksumPolicy::Enforce);
        loader.load_all().unwrap();

        let satellites = loader.satellites();
        assert_eq!(satellites.len(), 1);
        assert_eq!(satellites[0].id, "ISS (ZARYA)");
        assert_eq!(loader.rejected().len(), 1);
        assert_eq!(loader.rejected()[0].file, "broken.txt");

        assert!(loader.find("25544").is_some());
        assert!(loader.find("iss (zarya)").is_some());
        assert!(loader.find("hubble").is_none());
    }

    #[test]
    fn reload_picks_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = TleLoader::new(dir.path().to_path_buf(), ChecksumPolicy::Repair);
        loader.load_all().unwrap();
        assert!(loader.satellites().is_empty());

        write(dir.path(), "iss.tle", &format!("{PUBLISHED_1}\n{PUBLISHED_2}\n"));
        loader.reload().unwrap();
        assert_eq!(loader.get(25544).unwrap().epoch.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn missing_directory() {
        let mut loader = TleLoader::new(PathBuf::from("/nonexistent/tle"), ChecksumPolicy::Enforce);
        assert!(matches!(
            loader.load_all(),
            Err(PredictError::DirectoryNotFound(_))
        ));
    }
}
