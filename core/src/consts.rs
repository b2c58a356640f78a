/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::ops::RangeInclusive;

pub const PORT_RANGE: RangeInclusive<usize> = 1..=65535;

pub const SOURCE_SCHEMES: [&str; 4] = ["http", "https", "ssh", "git"];

pub const IMAGE_REPOSITORY: &str = "shipyard";
pub const CONTAINER_PREFIX: &str = "shipyard";
pub const CONTAINER_LABEL: &str = "shipyard.build";

pub const RESTART_DETAIL: &str = "interrupted by server restart";
pub const CANCELLED_DETAIL: &str = "cancelled";
