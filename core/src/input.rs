/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::path::{Component, Path};
use thiserror::Error;
use url::Url;

use super::consts::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
    #[error("`{0}` is not a valid repository url")]
    InvalidUrl(String),
    #[error("URLs pointing to local files are not allowed")]
    LocalFileUrl,
    #[error("unsupported repository scheme `{0}`")]
    UnsupportedScheme(String),
    #[error("build output directory `{0}` must stay inside the repository")]
    OutputDirEscapes(String),
}

pub fn port_in_range(s: &str) -> Result<u16, String> {
    let port: usize = s
        .parse()
        .map_err(|_| format!("`{s}` is not a port number"))?;

    if PORT_RANGE.contains(&port) {
        Ok(port as u16)
    } else {
        Err(format!(
            "port not in range {}-{}",
            PORT_RANGE.start(),
            PORT_RANGE.end()
        ))
    }
}

pub fn greater_than_zero<
    T: std::str::FromStr + std::cmp::PartialOrd + std::fmt::Display + Default,
>(
    s: &str,
) -> Result<T, String> {
    let num: T = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid number", s))?;

    if num > T::default() {
        Ok(num)
    } else {
        Err(format!("`{}` is not larger than 0", s))
    }
}

pub fn require_field(field: &'static str, value: &str) -> Result<(), InputError> {
    if value.trim().is_empty() {
        return Err(InputError::Empty(field));
    }

    Ok(())
}

/// Accepts `scheme://host/path` for the schemes in [`SOURCE_SCHEMES`] and scp-like
/// `user@host:path` remotes.
pub fn validate_source_location(location: &str) -> Result<(), InputError> {
    let location = location.trim();

    if location.is_empty() {
        return Err(InputError::Empty("project_github_url"));
    }

    if location.starts_with("file") || location.starts_with('/') || location.starts_with('.') {
        return Err(InputError::LocalFileUrl);
    }

    if location.contains("://") {
        let url = Url::parse(location).map_err(|_| InputError::InvalidUrl(location.to_string()))?;

        if !SOURCE_SCHEMES.contains(&url.scheme()) {
            return Err(InputError::UnsupportedScheme(url.scheme().to_string()));
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(InputError::InvalidUrl(location.to_string()));
        }

        return Ok(());
    }

    match location.split_once(':') {
        Some((host, path))
            if !host.is_empty()
                && !path.is_empty()
                && !host.contains('/')
                && !host.contains(char::is_whitespace) =>
        {
            Ok(())
        }
        _ => Err(InputError::InvalidUrl(location.to_string())),
    }
}

pub fn validate_build_output_dir(dir: &str) -> Result<(), InputError> {
    if dir.trim().is_empty() {
        return Err(InputError::Empty("build_out_dir"));
    }

    let path = Path::new(dir);
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });

    if escapes {
        return Err(InputError::OutputDirEscapes(dir.to_string()));
    }

    Ok(())
}
