// Diesel table definitions. Keep in sync with `db::migrations`.

diesel::table! {
    metadata (key) {
        key -> Text,
        value -> Nullable<Text>,
    }
}

diesel::table! {
    observations (local_id) {
        local_id -> Text,
        server_id -> Nullable<Text>,
        project_id -> Nullable<Text>,
        department_id -> Nullable<Text>,
        location_id -> Nullable<Text>,
        category_id -> Nullable<Text>,
        subcategory_id -> Nullable<Text>,
        supervisor_id -> Nullable<Text>,
        worker_full_name -> Nullable<Text>,
        description -> Nullable<Text>,
        status -> Nullable<Text>,
        risk_level -> Nullable<Integer>,
        deadline -> Nullable<Text>,
        answer -> Nullable<Text>,
        rejection_reason -> Nullable<Text>,
        media -> Nullable<Text>,
        version -> BigInt,
        created_at -> Text,
        updated_at -> Text,
        deleted_at -> Nullable<Text>,
        sync_status -> Text,
    }
}

diesel::table! {
    tasks (local_id) {
        local_id -> Text,
        server_id -> Nullable<Text>,
        observation_id -> Nullable<Text>,
        project_id -> Nullable<Text>,
        department_id -> Nullable<Text>,
        location_id -> Nullable<Text>,
        assignee_id -> Nullable<Text>,
        title -> Nullable<Text>,
        description -> Nullable<Text>,
        status -> Nullable<Text>,
        risk_level -> Nullable<Integer>,
        deadline -> Nullable<Text>,
        answer -> Nullable<Text>,
        rejection_reason -> Nullable<Text>,
        media -> Nullable<Text>,
        version -> BigInt,
        created_at -> Text,
        updated_at -> Text,
        deleted_at -> Nullable<Text>,
        sync_status -> Text,
    }
}

diesel::table! {
    sync_queue (id) {
        id -> Text,
        entity_type -> Text,
        entity_id -> Text,
        operation -> Text,
        payload -> Text,
        base_version -> Nullable<BigInt>,
        status -> Text,
        retry_count -> Integer,
        last_error -> Nullable<Text>,
        next_retry_at -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(metadata, observations, tasks, sync_queue);
