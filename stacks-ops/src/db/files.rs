//! Files attached to intranet pages

use sqlx::SqlitePool;
use stacks_common::db::FileAttachment;
use stacks_common::Result;

pub async fn get_by_page_id(pool: &SqlitePool, page_id: i64) -> Result<Vec<FileAttachment>> {
    let files = sqlx::query_as::<_, FileAttachment>(
        "SELECT * FROM file_attachments WHERE page_id = ? ORDER BY name",
    )
    .bind(page_id)
    .fetch_all(pool)
    .await?;
    Ok(files)
}
