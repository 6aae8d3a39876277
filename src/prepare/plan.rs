//! Reset plan
//!
//! The ordered steps that bring the test database back to a fixed state.
//! Every step is idempotent or guarded by an existence check.

use std::fmt;

use crate::config::DatabaseConfig;

/// Role and database a statement runs as / against
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub role: String,
    pub database: String,
}

/// A single DDL or administrative statement
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    TerminateSessions { databases: Vec<String> },
    EnsureRole { role: String },
    SetSearchPath { role: String, path: Vec<String> },
    DropDatabase { database: String },
    CreateDatabase { database: String, owner: String },
    CreateSchema { schema: String },
    CreateExtension { extension: String, schema: String },
}

impl Statement {
    pub fn to_sql(&self) -> String {
        match self {
            Statement::TerminateSessions { databases } => {
                let names = databases
                    .iter()
                    .map(|d| format!("'{d}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
                     WHERE datname IN ({names}) AND pid <> pg_backend_pid();"
                )
            }
            Statement::EnsureRole { role } => format!(
                "DO $$BEGIN IF NOT EXISTS (SELECT 1 FROM pg_roles WHERE rolname = '{role}') \
                 THEN CREATE ROLE {role} LOGIN; END IF; END$$;"
            ),
            Statement::SetSearchPath { role, path } => {
                format!("ALTER ROLE {role} SET search_path TO {};", path.join(","))
            }
            Statement::DropDatabase { database } => format!("DROP DATABASE IF EXISTS {database};"),
            Statement::CreateDatabase { database, owner } => {
                format!("CREATE DATABASE {database} OWNER={owner};")
            }
            Statement::CreateSchema { schema } => format!("CREATE SCHEMA IF NOT EXISTS {schema};"),
            Statement::CreateExtension { extension, schema } => {
                format!("CREATE EXTENSION IF NOT EXISTS {extension} SCHEMA {schema};")
            }
        }
    }
}

/// One step of the reset procedure
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    StopServices,
    Sql {
        connection: Connection,
        statement: Statement,
    },
    FlushCache,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::StopServices => write!(f, "stop supervised services"),
            Step::Sql {
                connection,
                statement,
            } => write!(
                f,
                "[{}@{}] {}",
                connection.role,
                connection.database,
                statement.to_sql()
            ),
            Step::FlushCache => write!(f, "flush shared cache"),
        }
    }
}

/// Which optional steps to include
#[derive(Clone, Copy, Debug, Default)]
pub struct PlanOptions {
    pub skip_supervisor: bool,
    pub skip_cache: bool,
}

/// Ordered reset steps
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResetPlan {
    steps: Vec<Step>,
}

impl ResetPlan {
    pub fn build(db: &DatabaseConfig, options: PlanOptions) -> Self {
        let admin = Connection {
            role: db.admin_role.clone(),
            database: db.maintenance_database.clone(),
        };
        let app = Connection {
            role: db.app_role.clone(),
            database: db.database.clone(),
        };
        let as_admin = |statement| Step::Sql {
            connection: admin.clone(),
            statement,
        };
        let as_app = |statement| Step::Sql {
            connection: app.clone(),
            statement,
        };

        let mut steps = Vec::new();
        if !options.skip_supervisor {
            steps.push(Step::StopServices);
        }

        steps.push(as_admin(Statement::TerminateSessions {
            databases: db.databases_to_terminate(),
        }));
        steps.push(as_admin(Statement::EnsureRole {
            role: db.app_role.clone(),
        }));
        steps.push(as_admin(Statement::SetSearchPath {
            role: db.app_role.clone(),
            path: db.search_path.clone(),
        }));
        steps.push(as_admin(Statement::DropDatabase {
            database: db.database.clone(),
        }));
        steps.push(as_admin(Statement::CreateDatabase {
            database: db.database.clone(),
            owner: db.app_role.clone(),
        }));

        steps.push(as_app(Statement::CreateSchema {
            schema: db.schema.clone(),
        }));
        for extension in &db.extensions {
            steps.push(as_app(Statement::CreateExtension {
                extension: extension.clone(),
                schema: db.schema.clone(),
            }));
        }

        if !options.skip_cache {
            steps.push(Step::FlushCache);
        }

        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}
