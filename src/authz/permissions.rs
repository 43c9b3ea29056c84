use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AccessError;

/// Atomic capability token. Permissions have no hierarchy of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // Dashboard
    ViewDashboard,

    // Project
    ViewProjects,
    CreateProject,
    EditProject,
    DeleteProject,

    // Task / board
    ViewTasks,
    CreateTask,
    EditTask,
    DeleteTask,
    AssignTask,
    ManageBoard,

    // Chat / files
    ViewChat,
    SendMessage,
    UploadFile,

    // Reports
    ViewReports,

    // Administration
    ManageUsers,
    ManageSettings,

    // Organization
    ManageMembers,
    ManageOrganization,
}

impl Permission {
    pub const ALL: &'static [Permission] = &[
        Permission::ViewDashboard,
        Permission::ViewProjects,
        Permission::CreateProject,
        Permission::EditProject,
        Permission::DeleteProject,
        Permission::ViewTasks,
        Permission::CreateTask,
        Permission::EditTask,
        Permission::DeleteTask,
        Permission::AssignTask,
        Permission::ManageBoard,
        Permission::ViewChat,
        Permission::SendMessage,
        Permission::UploadFile,
        Permission::ViewReports,
        Permission::ManageUsers,
        Permission::ManageSettings,
        Permission::ManageMembers,
        Permission::ManageOrganization,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', '.', ' '], "_");
        Self::ALL
            .iter()
            .copied()
            .find(|permission| permission.as_str() == normalized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewDashboard => "view_dashboard",
            Self::ViewProjects => "view_projects",
            Self::CreateProject => "create_project",
            Self::EditProject => "edit_project",
            Self::DeleteProject => "delete_project",
            Self::ViewTasks => "view_tasks",
            Self::CreateTask => "create_task",
            Self::EditTask => "edit_task",
            Self::DeleteTask => "delete_task",
            Self::AssignTask => "assign_task",
            Self::ManageBoard => "manage_board",
            Self::ViewChat => "view_chat",
            Self::SendMessage => "send_message",
            Self::UploadFile => "upload_file",
            Self::ViewReports => "view_reports",
            Self::ManageUsers => "manage_users",
            Self::ManageSettings => "manage_settings",
            Self::ManageMembers => "manage_members",
            Self::ManageOrganization => "manage_organization",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| AccessError::unknown_permission(s))
    }
}
