use miniyarn_primitives::{BinField, PackageInfo};
use miniyarn_utils::{FromFileString, GlobList, Path};

use crate::{archive, config::Environment, error::Error, project::{Project, MANIFEST_NAME}};

/// Top-level files shipped regardless of the `files` field. Matched against
/// the uppercased file name.
const ALWAYS_INCLUDED: &[&str] = &[
    "PACKAGE.JSON",
    "README*",
    "CHANGES*",
    "CHANGELOG*",
    "HISTORY*",
    "LICENSE*",
    "LICENCE*",
    "NOTICE*",
];

const ALWAYS_IGNORED: &[&str] = &[
    "node_modules",
    ".git",
];

fn normalize_pattern(pattern: &str) -> &str {
    pattern
        .trim_start_matches("./")
        .trim_end_matches('/')
}

/// The patterns a path must match to be packed, or `None` when the package
/// doesn't restrict its content.
fn allowlist_patterns(package_info: &PackageInfo) -> Option<Vec<String>> {
    if package_info.files.is_empty() {
        return None;
    }

    let mut patterns = package_info.files.iter()
        .map(|pattern| normalize_pattern(pattern).to_string())
        .collect::<Vec<_>>();

    match &package_info.bin {
        Some(BinField::Single(bin)) => patterns.push(normalize_pattern(bin).to_string()),
        Some(BinField::Map(bins)) => patterns.extend(bins.values().map(|bin| normalize_pattern(bin).to_string())),
        None => {},
    }

    if let Some(main) = &package_info.main {
        patterns.push(normalize_pattern(main).to_string());
    }

    Some(patterns)
}

pub fn pack_filename(project: &Project) -> Result<String, Error> {
    let name = project.package_info.name.as_ref()
        .ok_or_else(|| Error::MissingPackageName(project.root_locator()))?;

    let version = project.package_info.version.as_deref()
        .unwrap_or("0.0.0");

    Ok(format!("{}-{}.tgz", name.slug().trim_start_matches('@'), version))
}

struct PackFilter {
    output_name: String,
    always_included: GlobList,
    allowlist: Option<GlobList>,
}

impl PackFilter {
    fn new(project: &Project) -> Result<PackFilter, Error> {
        let allowlist = allowlist_patterns(&project.package_info)
            .map(GlobList::parse)
            .transpose()?;

        Ok(PackFilter {
            output_name: pack_filename(project)?,
            always_included: GlobList::parse(ALWAYS_INCLUDED)?,
            allowlist,
        })
    }

    fn is_ignored(&self, relative_path: &Path, env: &Environment) -> bool {
        let is_top_level
            = !relative_path.as_str().contains('/');

        relative_path.as_str().split('/').any(|segment| ALWAYS_IGNORED.contains(&segment))
            || (is_top_level && relative_path.as_str() == self.output_name)
            || (is_top_level && env.is_bookkeeping_file(relative_path))
    }

    fn is_allowed(&self, relative_path: &str) -> bool {
        let Some(allowlist) = &self.allowlist else {
            return true;
        };

        if !relative_path.contains('/') && self.always_included.is_match(&relative_path.to_uppercase()) {
            return true;
        }

        // Listing a directory ships everything below it
        let mut prefix = String::new();

        for segment in relative_path.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }

            prefix.push_str(segment);

            if allowlist.is_match(&prefix) {
                return true;
            }
        }

        false
    }
}

/// Lists the files that would be shipped in the package archive, relative to
/// the project directory.
pub fn pack_list(project: &Project, env: &Environment) -> Result<Vec<Path>, Error> {
    let entries
        = pack_entries(project, env)?;

    let paths = entries.iter()
        .map(|entry| Path::from_file_string(&entry.name))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(paths)
}

fn pack_entries(project: &Project, env: &Environment) -> Result<Vec<archive::Entry>, Error> {
    let filter
        = PackFilter::new(project)?;

    // Directories are kept while walking so that their descendants get a
    // chance to match; only files are checked against the allowlist
    let entries = archive::pack_directory(&project.project_cwd, &|relative_path| {
        !filter.is_ignored(relative_path, env)
    })?;

    let mut entries = entries.into_iter()
        .filter(|entry| filter.is_allowed(&entry.name))
        .collect::<Vec<_>>();

    entries.sort_by(|a, b| a.name.cmp(&b.name));

    if !entries.iter().any(|entry| entry.name == MANIFEST_NAME) {
        return Err(Error::ManifestNotFound(project.project_cwd.to_string()));
    }

    Ok(entries)
}

/// Writes the package archive next to the manifest and returns its path.
pub fn pack(project: &Project, env: &Environment) -> Result<Path, Error> {
    let entries
        = pack_entries(project, env)?;

    let entry_count
        = entries.len();

    let archive
        = archive::write_tgz(&archive::with_prefix(entries, "package"))?;

    let output_path
        = project.project_cwd.with_join_str(pack_filename(project)?);

    output_path.fs_write(&archive)?;

    log::info!("Packed {} files into {}", entry_count, output_path);

    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn make_project(manifest: &str, files: &[&str]) -> Project {
        let project_cwd = Path::temp_dir().unwrap();
        project_cwd.with_join_str(MANIFEST_NAME).fs_write_text(manifest).unwrap();

        for file in files {
            let path = project_cwd.with_join_str(file);
            path.fs_create_parent().unwrap();
            path.fs_write_text("").unwrap();
        }

        Project::new(&project_cwd).unwrap()
    }

    fn listed(project: &Project) -> Vec<String> {
        pack_list(project, &Environment::default()).unwrap()
            .into_iter()
            .map(|path| path.to_string())
            .collect()
    }

    #[rstest]
    #[case("pkg", "1.0.0", "pkg-1.0.0.tgz")]
    #[case("@scope/pkg", "2.1.0", "scope-pkg-2.1.0.tgz")]
    fn test_pack_filename(#[case] name: &str, #[case] version: &str, #[case] expected: &str) {
        let project = make_project(&format!(r#"{{"name": "{}", "version": "{}"}}"#, name, version), &[]);

        assert_eq!(pack_filename(&project).unwrap(), expected);
    }

    #[test]
    fn test_pack_everything_without_files_field() {
        let project = make_project(r#"{"name": "pkg", "version": "1.0.0"}"#, &[
            "index.js",
            "lib/util.js",
            "node_modules/dep/index.js",
            ".git/HEAD",
            ".yarn-atomic",
            "pkg-1.0.0.tgz",
        ]);

        assert_eq!(listed(&project), vec!["index.js", "lib/util.js", "package.json"]);
    }

    #[test]
    fn test_pack_with_files_field() {
        let project = make_project(r#"{
            "name": "pkg",
            "version": "1.0.0",
            "main": "./main.js",
            "bin": {"pkg": "./bin/cli.js"},
            "files": ["lib", "*.d.ts"]
        }"#, &[
            "main.js",
            "bin/cli.js",
            "bin/other.js",
            "lib/a.js",
            "lib/nested/b.js",
            "types/index.d.ts",
            "src/a.ts",
            "README.md",
            "license",
            "notes.txt",
        ]);

        assert_eq!(listed(&project), vec![
            "README.md",
            "bin/cli.js",
            "lib/a.js",
            "lib/nested/b.js",
            "license",
            "main.js",
            "package.json",
            "types/index.d.ts",
        ]);
    }

    #[test]
    fn test_pack_writes_archive() {
        let project = make_project(r#"{"name": "pkg", "version": "1.0.0"}"#, &["index.js"]);

        let output_path = pack(&project, &Environment::default()).unwrap();
        assert_eq!(output_path, project.project_cwd.with_join_str("pkg-1.0.0.tgz"));

        let names = archive::read_entries(&output_path.fs_read().unwrap(), None).unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["package/index.js", "package/package.json"]);

        // Packing twice doesn't pick up the previous archive
        let second_output_path = pack(&project, &Environment::default()).unwrap();
        assert_eq!(second_output_path.fs_read().unwrap(), output_path.fs_read().unwrap());
    }
}
