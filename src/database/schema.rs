// Tables of the pipeline tracking database that lanelet lookups read.

diesel::table! {
    file (id) {
        id -> Integer,
        path -> Text,
        keyvallist -> Integer,
        mtime -> Nullable<Timestamp>,
    }
}

diesel::table! {
    keyvallistmember (id) {
        id -> Integer,
        keyvallist -> Integer,
        keyval_key -> Text,
        val -> Text,
    }
}

diesel::table! {
    stepoutputfile (id) {
        id -> Integer,
        file -> Integer,
        output_key -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(file, keyvallistmember, stepoutputfile);
