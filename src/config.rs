use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::{CacheBackend, CliArgs};

#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub naming: String,
    pub structure: Vec<String>,
    pub commit: bool,
    pub fetch_metadata: bool,
    pub api_key: Option<String>,
    pub api_url: String,
    pub cache: Option<CacheConfig>,
    pub write_tags: bool,
    pub log_file: Option<PathBuf>,
    pub benchmark: bool,
    pub workers: Option<usize>,
    pub summary_json: Option<PathBuf>,
    pub quiet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub dir: PathBuf,
}

impl Config {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let input = normalize_input(args.input)?;
        let output = match args.output {
            Some(path) => absolutize(&path)?,
            None => input.clone(),
        };
        let structure = parse_structure(&args.folder_structure);
        let cache = if args.no_cache {
            None
        } else {
            let dir = match args.cache_dir {
                Some(path) => absolutize(&path)?,
                None => default_cache_dir(),
            };
            Some(CacheConfig {
                backend: args.cache_backend,
                dir,
            })
        };
        let log_file = args.log.map(|path| absolutize(&path)).transpose()?;
        let summary_json = args
            .summary_json
            .map(|path| absolutize(&path))
            .transpose()?;
        let workers = args.workers.filter(|count| *count > 0);
        let api_key = args.api_key.filter(|key| !key.trim().is_empty());

        Ok(Self {
            input,
            output,
            naming: args.naming_convention,
            structure,
            commit: args.commit,
            fetch_metadata: args.fetch_metadata,
            api_key,
            api_url: args.api_url,
            cache,
            write_tags: args.write_tags,
            log_file,
            benchmark: args.benchmark,
            workers,
            summary_json,
            quiet: args.quiet,
        })
    }

    pub fn dry_run(&self) -> bool {
        !self.commit
    }
}

fn normalize_input(input: Option<PathBuf>) -> Result<PathBuf> {
    let resolved = match input {
        Some(path) => absolutize(&path)?,
        None => std::env::current_dir().context("could not resolve current working directory")?,
    };
    ensure_directory(&resolved)?;
    Ok(resolved)
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir().context("could not resolve current working directory")?;
        Ok(cwd.join(path))
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    anyhow::ensure!(
        path.is_dir(),
        "Invalid path '{}'. Please provide a valid directory.",
        path.display()
    );
    Ok(())
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("audiobook-organizer")
}

fn parse_structure(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use clap::Parser;
    use tempfile::TempDir;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["audiobook-organizer"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).expect("cli args")
    }

    #[test]
    fn output_defaults_to_input() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().to_str().unwrap();

        let config = Config::from_args(args(&["--input", input])).expect("config");

        assert_eq!(config.input, temp.path());
        assert_eq!(config.output, temp.path());
        assert_eq!(config.naming, "{title} - {author}");
        assert!(config.structure.is_empty());
        assert!(config.dry_run());
        assert!(!config.fetch_metadata);
        assert_eq!(
            config.cache.as_ref().map(|cache| cache.backend),
            Some(CacheBackend::Json)
        );
        assert_eq!(config.workers, None);
    }

    #[test]
    fn structure_is_split_and_trimmed() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().to_str().unwrap();

        let config = Config::from_args(args(&[
            "--input",
            input,
            "--folder-structure",
            " genre , ,author,",
        ]))
        .expect("config");

        assert_eq!(config.structure, vec!["genre", "author"]);
    }

    #[test]
    fn relative_paths_resolve_against_cwd() {
        let temp = TempDir::new().unwrap();
        let cwd = std::env::current_dir().unwrap();
        let input = temp.path().join("library");
        fs::create_dir(&input).unwrap();

        let config = Config::from_args(args(&[
            "--input",
            input.to_str().unwrap(),
            "--output",
            "organized",
            "--cache-dir",
            "cache",
            "--summary-json",
            "run.json",
        ]))
        .expect("config");

        assert_eq!(config.output, cwd.join("organized"));
        assert_eq!(config.cache.unwrap().dir, cwd.join("cache"));
        assert_eq!(config.summary_json, Some(cwd.join("run.json")));
    }

    #[test]
    fn no_cache_disables_cache_and_blank_key_is_dropped() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().to_str().unwrap();

        let config = Config::from_args(args(&[
            "--input",
            input,
            "--no-cache",
            "--api-key",
            "  ",
            "--workers",
            "0",
            "--commit",
        ]))
        .expect("config");

        assert!(config.cache.is_none());
        assert!(config.api_key.is_none());
        assert_eq!(config.workers, None);
        assert!(!config.dry_run());
    }

    #[test]
    fn missing_input_yields_error() {
        let temp = TempDir::new().unwrap();
        let nonexistent = temp.path().join("missing");

        let error = Config::from_args(args(&["--input", nonexistent.to_str().unwrap()]))
            .unwrap_err();
        let message = format!("{error:#}");
        assert!(
            message.contains(nonexistent.to_string_lossy().as_ref()),
            "unexpected error message: {message}"
        );
    }

    #[test]
    fn file_as_input_yields_error() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("book.mp3");
        fs::write(&file, b"fake").unwrap();

        assert!(Config::from_args(args(&["--input", file.to_str().unwrap()])).is_err());
    }
}
