//! Esquema Diesel (declarado manualmente; reemplazable con `diesel
//! print-schema`). Los ids UUID se guardan como TEXT en SQLite.

diesel::table! {
    storage_roots (id) {
        id -> Text,
        root -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    runs (id) {
        id -> Text,
        name -> Nullable<Text>,
        reference -> Nullable<Text>,
        reference_type -> Nullable<Text>,
        created_by -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    data_objects (id) {
        id -> Text,
        name -> Text,
        suffix -> Text,
        hash -> Nullable<Text>,
        size -> BigInt,
        storage_id -> Text,
        run_id -> Text,
        created_by -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    run_inputs (run_id, data_object_id) {
        run_id -> Text,
        data_object_id -> Text,
    }
}

diesel::table! {
    species (id) {
        id -> Text,
        common_name -> Text,
    }
}

diesel::table! {
    genes (id) {
        id -> Text,
        label -> Text,
        name -> Nullable<Text>,
        species_id -> Text,
    }
}

diesel::table! {
    proteins (id) {
        id -> Text,
        label -> Text,
        name -> Nullable<Text>,
        species_id -> Text,
    }
}

diesel::table! {
    cell_markers (id) {
        id -> Text,
        label -> Text,
        name -> Nullable<Text>,
        species_id -> Text,
    }
}

diesel::table! {
    feature_sets (id) {
        id -> Text,
        kind -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    feature_sets_genes (feature_set_id, gene_id) {
        feature_set_id -> Text,
        gene_id -> Text,
    }
}

diesel::table! {
    feature_sets_proteins (feature_set_id, protein_id) {
        feature_set_id -> Text,
        protein_id -> Text,
    }
}

diesel::table! {
    feature_sets_cell_markers (feature_set_id, cell_marker_id) {
        feature_set_id -> Text,
        cell_marker_id -> Text,
    }
}

diesel::table! {
    data_objects_feature_sets (data_object_id, feature_set_id) {
        data_object_id -> Text,
        feature_set_id -> Text,
    }
}

diesel::table! {
    usage_events (id) {
        id -> BigInt,
        data_object_id -> Text,
        kind -> Text,
        user_id -> Text,
        at -> Timestamp,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    storage_roots,
    runs,
    data_objects,
    run_inputs,
    species,
    genes,
    proteins,
    cell_markers,
    feature_sets,
    feature_sets_genes,
    feature_sets_proteins,
    feature_sets_cell_markers,
    data_objects_feature_sets,
    usage_events,
);
