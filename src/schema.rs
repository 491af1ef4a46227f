diesel::table! {
    species (scientific_name) {
        scientific_name -> Text,
        common_name -> Nullable<Text>,
        external_ids -> Text,
        photo_url -> Nullable<Text>,
        description_text -> Nullable<Text>,
        description_generated_at -> Nullable<Timestamp>,
        region -> Nullable<Text>,
        behavior -> Nullable<Text>,
        difficulty -> Nullable<Text>,
        wiki_url -> Nullable<Text>,
        source_providers -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}
