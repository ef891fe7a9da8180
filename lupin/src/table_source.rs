//! Resolving the three input tables by key
//!
//! The pipeline only ever asks a `TableSource` for a table; whether it
//! comes from a cache directory or an explicit path is the source's
//! business. Nothing here prompts the user.

use crate::common::*;
use crate::feature_block::{BlockKind, FeatureBlock, SourcedBlock};
use std::path::{Path, PathBuf};

/// Column holding the sample identifier
pub const SAMPLE_ID_COLUMN: &str = "bodyId";

/// What to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableKey {
    pub kind: BlockKind,
    /// Substring the table name must contain
    pub filter: Box<str>,
}

pub trait TableSource {
    fn resolve(&self, key: &TableKey) -> Result<SourcedBlock>;
}

/// Read a sample table: data columns start right after `bodyId`. A
/// leading unnamed index column (as written by pandas) is skipped;
/// without a `bodyId` column the first column is the identifier.
pub fn read_feature_table(kind: BlockKind, file: &str) -> Result<SourcedBlock> {
    let delim: &[char] = &[',', '\t'];
    let header = io::read_lines_of_words_delim(file, delim, Some(0))?.header;

    let id_col = header
        .iter()
        .position(|h| h.trim() == SAMPLE_ID_COLUMN)
        .unwrap_or(0);

    let table = Mat::read_data(file, delim, id_col, id_col + 1)?;
    let block = FeatureBlock::from_table(kind, table)?;

    info!(
        "{}: {} samples x {} columns from {}",
        kind,
        block.nrows(),
        block.ncols(),
        file
    );

    Ok(SourcedBlock {
        origin: io::file_name(file)?,
        block,
    })
}

/// Cache layout `{root}/{kind}/{kind}_*.csv`
#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cached tables of a kind whose names contain `filter`, sorted
    pub fn candidates(&self, kind: BlockKind, filter: &str) -> Result<Vec<PathBuf>> {
        let dir = self.root.join(kind.name());
        let prefix = format!("{}_", kind.name());

        let entries = std::fs::read_dir(&dir).map_err(|e| {
            LupinError::Source(format!("cannot list {}: {}", dir.display(), e))
        })?;

        let mut found = vec![];
        for entry in entries {
            let path = entry.map_err(anyhow::Error::from)?.path();
            let name = match path.file_name().and_then(|x| x.to_str()) {
                Some(name) => name,
                None => continue,
            };
            let is_table = name.ends_with(".csv") || name.ends_with(".csv.gz");
            if is_table && name.starts_with(&prefix) && name.contains(filter) {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }

    fn only_candidate(&self, key: &TableKey) -> Result<PathBuf> {
        let mut found = self.candidates(key.kind, &key.filter)?;
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(LupinError::Source(format!(
                "no cached {} table matching `{}` under {}",
                key.kind,
                key.filter,
                self.root.display()
            ))),
            _ => Err(LupinError::Source(format!(
                "{} cached {} tables match `{}`; narrow the filter:\n{}",
                found.len(),
                key.kind,
                key.filter,
                found
                    .iter()
                    .map(|p| format!("  {}", p.display()))
                    .collect::<Vec<_>>()
                    .join("\n")
            ))),
        }
    }

    /// Resolve all three tables. The spread table is the one paired
    /// with the chosen depth table.
    pub fn resolve_all(&self, filter: &str) -> Result<[SourcedBlock; 3]> {
        let connectivity = self.resolve(&TableKey {
            kind: BlockKind::Connectivity,
            filter: filter.into(),
        })?;
        let depth = self.resolve(&TableKey {
            kind: BlockKind::Depth,
            filter: filter.into(),
        })?;
        let spread_name = paired_spread_name(&depth.origin)?;
        let spread_file = self
            .root
            .join(BlockKind::Spread.name())
            .join(&*spread_name);
        let spread = read_feature_table(BlockKind::Spread, &path_str(&spread_file)?)?;
        Ok([connectivity, depth, spread])
    }
}

impl TableSource for CacheDir {
    fn resolve(&self, key: &TableKey) -> Result<SourcedBlock> {
        let path = self.only_candidate(key)?;
        read_feature_table(key.kind, &path_str(&path)?)
    }
}

/// Explicit file per table kind
#[derive(Debug, Clone)]
pub struct FileTables {
    pub connectivity: Box<str>,
    pub depth: Box<str>,
    pub spread: Box<str>,
}

impl TableSource for FileTables {
    fn resolve(&self, key: &TableKey) -> Result<SourcedBlock> {
        let file = match key.kind {
            BlockKind::Connectivity => &self.connectivity,
            BlockKind::Depth => &self.depth,
            BlockKind::Spread => &self.spread,
        };
        if !file.contains(&*key.filter) {
            return Err(LupinError::Source(format!(
                "{} does not match `{}`",
                file, key.filter
            )));
        }
        read_feature_table(key.kind, file)
    }
}

/// `depth_X.csv` -> `spread_X.csv`
pub fn paired_spread_name(depth_name: &str) -> Result<Box<str>> {
    depth_name
        .strip_prefix(BlockKind::Depth.name())
        .map(|rest| format!("{}{}", BlockKind::Spread.name(), rest).into_boxed_str())
        .ok_or_else(|| {
            LupinError::Source(format!(
                "depth table name {} does not start with `depth`",
                depth_name
            ))
        })
}

fn path_str(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| LupinError::Source(format!("non-UTF-8 path {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, lines: &[&str]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, lines.join("\n")).unwrap();
    }

    #[test]
    fn spread_name_follows_depth_name() {
        assert_eq!(
            &*paired_spread_name("depth_LT1_pre_bodyidlist_ub1000.csv").unwrap(),
            "spread_LT1_pre_bodyidlist_ub1000.csv"
        );
        assert!(paired_spread_name("connectivity_x.csv").is_err());
    }

    #[test]
    fn reads_pandas_index_column() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("depth_a.csv");
        write(&file, &[",bodyId,bin0,bin1", "0,11,1,2", "1,12,3,4"]);

        let t = read_feature_table(BlockKind::Depth, file.to_str().unwrap())?;
        assert_eq!(&*t.origin, "depth_a.csv");
        assert_eq!(t.block.samples(), &[Box::<str>::from("11"), Box::<str>::from("12")]);
        assert_eq!(t.block.columns(), &[Box::<str>::from("bin0"), Box::<str>::from("bin1")]);
        assert_eq!(t.block.mat()[(1, 1)], 4.0);
        Ok(())
    }

    #[test]
    fn cache_requires_a_unique_match() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        for name in ["connectivity_bodyidlist_a.csv", "connectivity_bodyidlist_b.csv"] {
            write(&root.join("connectivity").join(name), &["bodyId,LC4", "1,2", "2,3"]);
        }

        let cache = CacheDir::new(root);
        let key = |filter: &str| TableKey {
            kind: BlockKind::Connectivity,
            filter: filter.into(),
        };

        assert!(matches!(cache.resolve(&key("bodyidlist")), Err(LupinError::Source(_))));
        assert!(matches!(cache.resolve(&key("zzz")), Err(LupinError::Source(_))));
        let t = cache.resolve(&key("list_b"))?;
        assert_eq!(&*t.origin, "connectivity_bodyidlist_b.csv");
        Ok(())
    }
}
