/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of a build. `Running` and `Failed` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, DeriveActiveEnum, EnumIter, Deserialize, Serialize,
)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
pub enum BuildStatus {
    #[sea_orm(num_value = 0)]
    Pending,
    #[sea_orm(num_value = 1)]
    Cloning,
    #[sea_orm(num_value = 2)]
    Building,
    #[sea_orm(num_value = 3)]
    Publishing,
    #[sea_orm(num_value = 4)]
    Deploying,
    #[sea_orm(num_value = 5)]
    Running,
    #[sea_orm(num_value = 6)]
    Failed,
}

impl BuildStatus {
    /// Position in the progress order. `Failed` has no rank.
    pub fn rank(&self) -> Option<u8> {
        match self {
            BuildStatus::Pending => Some(0),
            BuildStatus::Cloning => Some(1),
            BuildStatus::Building => Some(2),
            BuildStatus::Publishing => Some(3),
            BuildStatus::Deploying => Some(4),
            BuildStatus::Running => Some(5),
            BuildStatus::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildStatus::Running | BuildStatus::Failed)
    }

    /// The progress state following this one, if any.
    pub fn next(&self) -> Option<BuildStatus> {
        match self {
            BuildStatus::Pending => Some(BuildStatus::Cloning),
            BuildStatus::Cloning => Some(BuildStatus::Building),
            BuildStatus::Building => Some(BuildStatus::Publishing),
            BuildStatus::Publishing => Some(BuildStatus::Deploying),
            BuildStatus::Deploying => Some(BuildStatus::Running),
            BuildStatus::Running | BuildStatus::Failed => None,
        }
    }

    /// Only single forward steps and `Failed` from a non-terminal state are allowed.
    pub fn can_transition_to(&self, next: BuildStatus) -> bool {
        if self.is_terminal() {
            return false;
        }

        next == BuildStatus::Failed || self.next() == Some(next)
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildStatus::Pending => "Pending",
            BuildStatus::Cloning => "Cloning",
            BuildStatus::Building => "Building",
            BuildStatus::Publishing => "Publishing",
            BuildStatus::Deploying => "Deploying",
            BuildStatus::Running => "Running",
            BuildStatus::Failed => "Failed",
        };

        write!(f, "{}", s)
    }
}

impl std::str::FromStr for BuildStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(BuildStatus::Pending),
            "Cloning" => Ok(BuildStatus::Cloning),
            "Building" => Ok(BuildStatus::Building),
            "Publishing" => Ok(BuildStatus::Publishing),
            "Deploying" => Ok(BuildStatus::Deploying),
            "Running" => Ok(BuildStatus::Running),
            "Failed" => Ok(BuildStatus::Failed),
            _ => Err(format!("Unknown build status: {}", s)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "build")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub source_location: String,
    pub build_command: String,
    pub build_output_dir: String,
    pub status: BuildStatus,
    #[sea_orm(column_type = "Text")]
    pub log: String,
    pub image_ref: Option<String>,
    pub published_ref: Option<String>,
    pub endpoint: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::build_event::Entity")]
    BuildEvent,
}

impl Related<super::build_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BuildEvent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
