use std::path::{Path, PathBuf};

use actix_multipart::{Multipart, MultipartError};
use actix_web::web;
use anyhow::Context;
use futures::TryStreamExt;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Public route the upload directory is served under.
pub const UPLOADS_ROUTE: &str = "/public/uploads";

const IMAGE_FIELD: &str = "image";

/// An image part read from a multipart body.
#[derive(Debug)]
pub struct ImageUpload {
    pub extension: &'static str,
    pub data: Vec<u8>,
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::invalid(format!("Invalid multipart body: {e}"))
}

/// Normalised extension of an accepted image file name.
fn image_extension(filename: Option<&str>) -> AppResult<&'static str> {
    let ext = filename
        .and_then(|f| Path::new(f).extension())
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => Ok("jpg"),
        "png" => Ok("png"),
        "gif" => Ok("gif"),
        "webp" => Ok("webp"),
        _ => Err(AppError::invalid("Profile image must be a jpg, png, gif or webp file")),
    }
}

/// Reads the `image` part, skipping other parts and refusing more than `limit` bytes.
pub async fn read_image(mut payload: Multipart, limit: usize) -> AppResult<ImageUpload> {
    while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
        let disposition = field.content_disposition();
        let name = disposition.get_name().map(str::to_owned);
        let filename = disposition.get_filename().map(str::to_owned);

        if name.as_deref() != Some(IMAGE_FIELD) {
            while field.try_next().await.map_err(bad_multipart)?.is_some() {}
            continue;
        }

        let extension = image_extension(filename.as_deref())?;
        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
            if data.len() + chunk.len() > limit {
                return Err(AppError::invalid(format!("Profile image exceeds {limit} bytes")));
            }
            data.extend_from_slice(&chunk);
        }
        if data.is_empty() {
            return Err(AppError::invalid("Profile image is empty"));
        }
        return Ok(ImageUpload { extension, data });
    }

    Err(AppError::invalid("'image' file part is required"))
}

/// Writes the image under a fresh name in `dir` and returns that name.
pub async fn store(dir: &str, image: ImageUpload) -> AppResult<String> {
    let file_name = format!("{}.{}", Uuid::new_v4(), image.extension);
    let path: PathBuf = Path::new(dir).join(&file_name);

    let target = path.clone();
    web::block(move || std::fs::write(&target, &image.data))
        .await
        .map_err(|e| anyhow::anyhow!("upload writer failed: {e}"))?
        .with_context(|| format!("Failed to store {}", path.display()))?;

    Ok(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test};

    #[::core::prelude::v1::test]
    fn accepts_common_image_extensions_only() {
        assert_eq!(image_extension(Some("me.JPEG")).unwrap(), "jpg");
        assert_eq!(image_extension(Some("avatar.png")).unwrap(), "png");
        assert!(image_extension(Some("notes.txt")).is_err());
        assert!(image_extension(Some("no-extension")).is_err());
        assert!(image_extension(None).is_err());
    }

    async fn echo_extension(payload: Multipart) -> AppResult<HttpResponse> {
        let image = read_image(payload, 16).await?;
        Ok(HttpResponse::Ok().body(image.extension))
    }

    fn form(parts: &[(&str, &str, &str)]) -> String {
        let mut body = String::new();
        for (name, filename, content) in parts {
            body.push_str(&format!(
                "--XBOUNDARY\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str("--XBOUNDARY--\r\n");
        body
    }

    #[actix_web::test]
    async fn reads_the_image_part_within_the_limit() {
        let app = test::init_service(App::new().route("/upload", web::post().to(echo_extension))).await;

        let cases = [
            (form(&[("note", "a.txt", "skip me"), ("image", "me.PNG", "pixels")]), StatusCode::OK),
            (form(&[("image", "big.png", "this is more than sixteen bytes")]), StatusCode::BAD_REQUEST),
            (form(&[("avatar", "me.png", "pixels")]), StatusCode::BAD_REQUEST),
            (form(&[("image", "me.exe", "pixels")]), StatusCode::BAD_REQUEST),
        ];

        for (body, expected) in cases {
            let req = test::TestRequest::post()
                .uri("/upload")
                .insert_header(("Content-Type", "multipart/form-data; boundary=XBOUNDARY"))
                .set_payload(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), expected);
            if expected == StatusCode::OK {
                assert_eq!(test::read_body(resp).await, "png");
            }
        }
    }

    #[actix_web::test]
    async fn stores_under_a_generated_name() {
        let dir = std::env::temp_dir().join(format!("ems-uploads-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let image = ImageUpload {
            extension: "png",
            data: b"pixels".to_vec(),
        };
        let name = store(dir.to_str().unwrap(), image).await.unwrap();

        assert!(name.ends_with(".png"));
        assert_eq!(std::fs::read(dir.join(&name)).unwrap(), b"pixels");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
