//! Schema history. Steps are append-only; never edit a released step.

use super::MigrationStep;

pub const SCHEMA_VERSION: i32 = 3;

pub const MIGRATIONS: &[MigrationStep] = &[
    MigrationStep {
        to_version: 1,
        statements: &[
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT
            )",
            "CREATE TABLE IF NOT EXISTS observations (
                local_id TEXT PRIMARY KEY NOT NULL,
                server_id TEXT,
                project_id TEXT,
                department_id TEXT,
                location_id TEXT,
                category_id TEXT,
                subcategory_id TEXT,
                supervisor_id TEXT,
                worker_full_name TEXT,
                description TEXT,
                status TEXT,
                risk_level INTEGER,
                deadline TEXT,
                answer TEXT,
                rejection_reason TEXT,
                media TEXT,
                version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT,
                sync_status TEXT NOT NULL DEFAULT 'PENDING'
            )",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_observations_server_id ON observations(server_id)",
            "CREATE INDEX IF NOT EXISTS idx_observations_updated_at ON observations(updated_at)",
            "CREATE INDEX IF NOT EXISTS idx_observations_deleted_at ON observations(deleted_at)",
            "CREATE TABLE IF NOT EXISTS tasks (
                local_id TEXT PRIMARY KEY NOT NULL,
                server_id TEXT,
                observation_id TEXT,
                project_id TEXT,
                department_id TEXT,
                location_id TEXT,
                assignee_id TEXT,
                title TEXT,
                description TEXT,
                status TEXT,
                risk_level INTEGER,
                deadline TEXT,
                answer TEXT,
                rejection_reason TEXT,
                media TEXT,
                version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT,
                sync_status TEXT NOT NULL DEFAULT 'PENDING'
            )",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_server_id ON tasks(server_id)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_updated_at ON tasks(updated_at)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_deleted_at ON tasks(deleted_at)",
            "CREATE TABLE IF NOT EXISTS profiles (
                local_id TEXT PRIMARY KEY NOT NULL,
                server_id TEXT,
                full_name TEXT,
                email TEXT,
                phone TEXT,
                role TEXT,
                avatar TEXT,
                version INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                deleted_at TEXT,
                sync_status TEXT NOT NULL DEFAULT 'SYNCED'
            )",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_profiles_server_id ON profiles(server_id)",
            "CREATE INDEX IF NOT EXISTS idx_profiles_updated_at ON profiles(updated_at)",
            "CREATE INDEX IF NOT EXISTS idx_profiles_deleted_at ON profiles(deleted_at)",
            "CREATE TABLE IF NOT EXISTS attachments (
                local_id TEXT PRIMARY KEY NOT NULL,
                server_id TEXT,
                owner_type TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                uri TEXT NOT NULL,
                mime_type TEXT,
                version INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                deleted_at TEXT,
                sync_status TEXT NOT NULL DEFAULT 'PENDING'
            )",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_attachments_server_id ON attachments(server_id)",
            "CREATE INDEX IF NOT EXISTS idx_attachments_updated_at ON attachments(updated_at)",
            "CREATE INDEX IF NOT EXISTS idx_attachments_deleted_at ON attachments(deleted_at)",
            "CREATE TABLE IF NOT EXISTS sync_queue (
                id TEXT PRIMARY KEY NOT NULL,
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                operation TEXT NOT NULL,
                payload TEXT NOT NULL,
                base_version INTEGER,
                status TEXT NOT NULL DEFAULT 'PENDING',
                retry_count INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_sync_queue_status ON sync_queue(status)",
        ],
    },
    MigrationStep {
        to_version: 2,
        statements: &[
            "CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                parent_id TEXT,
                updated_at TEXT,
                deleted_at TEXT
            )",
            "CREATE INDEX IF NOT EXISTS idx_projects_updated_at ON projects(updated_at)",
            "CREATE INDEX IF NOT EXISTS idx_projects_deleted_at ON projects(deleted_at)",
            "CREATE TABLE IF NOT EXISTS departments (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                parent_id TEXT,
                updated_at TEXT,
                deleted_at TEXT
            )",
            "CREATE INDEX IF NOT EXISTS idx_departments_updated_at ON departments(updated_at)",
            "CREATE INDEX IF NOT EXISTS idx_departments_deleted_at ON departments(deleted_at)",
            "CREATE TABLE IF NOT EXISTS supervisors (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                parent_id TEXT,
                updated_at TEXT,
                deleted_at TEXT
            )",
            "CREATE INDEX IF NOT EXISTS idx_supervisors_updated_at ON supervisors(updated_at)",
            "CREATE INDEX IF NOT EXISTS idx_supervisors_deleted_at ON supervisors(deleted_at)",
            "CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                parent_id TEXT,
                updated_at TEXT,
                deleted_at TEXT
            )",
            "CREATE INDEX IF NOT EXISTS idx_categories_updated_at ON categories(updated_at)",
            "CREATE INDEX IF NOT EXISTS idx_categories_deleted_at ON categories(deleted_at)",
            "CREATE TABLE IF NOT EXISTS subcategories (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                parent_id TEXT,
                updated_at TEXT,
                deleted_at TEXT
            )",
            "CREATE INDEX IF NOT EXISTS idx_subcategories_updated_at ON subcategories(updated_at)",
            "CREATE INDEX IF NOT EXISTS idx_subcategories_deleted_at ON subcategories(deleted_at)",
            "CREATE TABLE IF NOT EXISTS locations (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                parent_id TEXT,
                updated_at TEXT,
                deleted_at TEXT
            )",
            "CREATE INDEX IF NOT EXISTS idx_locations_updated_at ON locations(updated_at)",
            "CREATE INDEX IF NOT EXISTS idx_locations_deleted_at ON locations(deleted_at)",
        ],
    },
    MigrationStep {
        to_version: 3,
        statements: &[
            "ALTER TABLE sync_queue ADD COLUMN next_retry_at TEXT",
            "CREATE INDEX IF NOT EXISTS idx_sync_queue_entity ON sync_queue(entity_type, entity_id)",
            "CREATE INDEX IF NOT EXISTS idx_sync_queue_created_at ON sync_queue(created_at)",
        ],
    },
];
