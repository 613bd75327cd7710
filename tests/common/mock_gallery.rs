//! A gallery served by wiremock

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Gallery `foo12` whose images live at `/gallery/foo12/images/foo<N>.jpg`
pub struct MockGallery {
    pub server: MockServer,
}

impl MockGallery {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn seed_url(&self) -> String {
        format!("{}/gallery/foo12/index.html", self.server.uri())
    }

    pub fn image_path(index: u32) -> String {
        format!("/gallery/foo12/images/foo{index}.jpg")
    }

    /// Serve `template` for image `index`
    pub async fn respond(&self, index: u32, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(Self::image_path(index)))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    /// Serve `body` as a JPEG for image `index`
    pub async fn serve_image(&self, index: u32, body: &[u8]) {
        self.respond(
            index,
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/jpeg")
                .set_body_bytes(body.to_vec()),
        )
        .await;
    }

    /// Answer image `index` with a bare status code
    pub async fn serve_status(&self, index: u32, status: u16) {
        self.respond(index, ResponseTemplate::new(status)).await;
    }

    /// Requests received for image `index`
    pub async fn requests_for(&self, index: u32) -> usize {
        let wanted = Self::image_path(index);
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == wanted)
            .count()
    }

    /// Requests received in total
    pub async fn total_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}
