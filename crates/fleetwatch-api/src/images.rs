use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{Image, ImageListResponse, ImageQuery};

impl ApiClient {
    /// `GET /api/images`
    pub async fn list_images(&self, query: &ImageQuery) -> Result<Vec<Image>, Error> {
        let resp: ImageListResponse = self
            .get_with_params("api/images", &query.to_params())
            .await?;
        Ok(resp.images)
    }

    /// `GET /api/images/{id}`
    pub async fn get_image(&self, id: Uuid) -> Result<Image, Error> {
        self.get(&format!("api/images/{id}")).await
    }
}
