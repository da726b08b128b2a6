use crate::Result;
use camino::Utf8Path;
use ohno::{EnrichableExt, IntoAppError, bail};
use std::fs;

fn ensure_toml_extension(path: &Utf8Path, what: &str) -> Result<()> {
    if path.extension() != Some("toml") {
        bail!("{what} '{path}' must be a .toml file");
    }
    Ok(())
}

pub(crate) fn load_toml<T>(path: &Utf8Path, what: &str, parse: impl FnOnce(&str) -> Result<T>) -> Result<T> {
    ensure_toml_extension(path, what)?;
    let text = fs::read_to_string(path).into_app_err_with(|| format!("reading {what} '{path}'"))?;
    parse(&text).map_err(|e| e.enrich_with(|| format!("parsing {what} '{path}'")))
}

pub(crate) fn save_toml(path: &Utf8Path, what: &str, text: &str) -> Result<()> {
    ensure_toml_extension(path, what)?;

    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{parent}'"))?;
    }

    fs::write(path, text).into_app_err_with(|| format!("writing {what} '{path}'"))
}
