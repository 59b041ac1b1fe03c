use mongodb::{bson::doc, Database, IndexModel};

pub async fn ensure_indexes(db: &Database) -> Result<(), String> {
    // conversations: per-user list, most recently updated first
    {
        let col = db.collection::<mongodb::bson::Document>("conversations");
        let model = IndexModel::builder()
            .keys(doc! { "user": 1, "updated_at": -1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // messages: history in order, cascading delete by conversation
    {
        let col = db.collection::<mongodb::bson::Document>("messages");
        let model = IndexModel::builder()
            .keys(doc! { "conversation": 1, "created_at": 1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    Ok(())
}
