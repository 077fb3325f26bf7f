//! Handlers for the `/files` surface: list, read, write, mkdir.

use axum::body::Body;
use axum::extract::{Multipart, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use axum::Extension;
use protocol::{permissions, ListFilesResponse, MessageResponse, MkdirOptions};
use serde::Deserialize;
use tracing::info;

use super::{require_permission, ApiError, AppState};
use crate::auth::Identity;
use crate::files::{download_stream, receive_file};

#[derive(Deserialize)]
pub(crate) struct DirQuery {
    pub(crate) dir: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct PathQuery {
    pub(crate) path: Option<String>,
}

/// `GET /files/ls?dir=<relative>` — list a directory.
pub async fn ls(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<DirQuery>,
) -> Result<Json<ListFilesResponse>, ApiError> {
    let dir = query
        .dir
        .ok_or_else(|| ApiError::Validation("missing dir parameter".to_string()))?;
    require_permission(&state, &identity, permissions::READ)?;

    let files = state.gateway.list(&dir).await?;
    info!(
        username = identity.username(),
        %dir,
        count = files.len(),
        "list directory"
    );
    Ok(Json(ListFilesResponse { files }))
}

/// `GET /files/readFile?path=<relative>` — stream a file's content.
pub async fn read_file(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    let path = query
        .path
        .ok_or_else(|| ApiError::Validation("missing file path".to_string()))?;
    require_permission(&state, &identity, permissions::READ)?;

    let (file, size) = state.gateway.open_read(&path).await?;
    let mime = mime_guess::from_path(&path).first_or_octet_stream();

    info!(username = identity.username(), %path, size, "stream file");
    Ok((
        [
            (header::CONTENT_TYPE, mime.essence_str().to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
        ],
        Body::from_stream(download_stream(file)),
    )
        .into_response())
}

/// `POST /files/writeFile?path=<dir>` — receive a multipart upload.
///
/// The query names the target directory; the uploaded part names the file.
/// The combined target re-passes the sandbox inside `receive_file` before
/// any byte is persisted.
pub async fn write_file(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<PathQuery>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    require_permission(&state, &identity, permissions::WRITE)?;

    let dir = query.path.unwrap_or_else(|| "/".to_string());
    // Directory-level gate before any of the body is consumed.
    state.gateway.resolve(&dir)?;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Validation("upload part has no filename".to_string()))?;

        let chunks = futures_util::stream::try_unfold(&mut field, |field| async move {
            match field.chunk().await {
                Ok(Some(bytes)) => Ok(Some((bytes, field))),
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            }
        });

        receive_file(&state.gateway, &dir, &filename, chunks).await?;
        info!(username = identity.username(), %dir, %filename, "file uploaded");
        return Ok(Json(MessageResponse::new("File uploaded successfully")));
    }

    Err(ApiError::Validation("no file uploaded".to_string()))
}

/// `POST /files/mkdir?path=<relative>` — create a directory.
///
/// The body is an optional JSON `{"recursive": bool}`.
pub async fn mkdir(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<PathQuery>,
    options: Option<Json<MkdirOptions>>,
) -> Result<Json<MessageResponse>, ApiError> {
    let path = query
        .path
        .ok_or_else(|| ApiError::Validation("missing directory path".to_string()))?;
    require_permission(&state, &identity, permissions::WRITE)?;

    let options = options.map(|Json(o)| o).unwrap_or_default();

    state.gateway.mkdir(&path, options.recursive).await?;
    info!(
        username = identity.username(),
        %path,
        recursive = options.recursive,
        "directory created"
    );
    Ok(Json(MessageResponse::new(format!(
        "Directory created: {path}"
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{identity, state};

    fn dir_query(dir: Option<&str>) -> Query<DirQuery> {
        Query(DirQuery {
            dir: dir.map(str::to_string),
        })
    }

    fn path_query(path: Option<&str>) -> Query<PathQuery> {
        Query(PathQuery {
            path: path.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_ls_lists_root() {
        let (_temp, app) = state();
        std::fs::write(app.gateway.root().join("a.txt"), "a").unwrap();

        let Json(resp) = ls(State(app.clone()), identity("alice"), dir_query(Some("/")))
            .await
            .unwrap();
        assert_eq!(resp.files, vec!["a.txt"]);
    }

    #[tokio::test]
    async fn test_ls_requires_dir_parameter() {
        let (_temp, app) = state();
        let result = ls(State(app), identity("alice"), dir_query(None)).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_ls_missing_directory_is_not_found() {
        let (_temp, app) = state();
        let result = ls(State(app), identity("alice"), dir_query(Some("ghost"))).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_ls_traversal_rejected() {
        let (_temp, app) = state();
        let result = ls(State(app), identity("alice"), dir_query(Some("/../../etc"))).await;
        assert!(matches!(result, Err(ApiError::PathEscape(_))));
    }

    #[tokio::test]
    async fn test_read_requires_read_permission() {
        let (_temp, app) = state();
        // root's role only has manageUsers.
        let result = read_file(State(app), identity("root"), path_query(Some("a.txt"))).await;
        assert!(matches!(result, Err(ApiError::Forbidden)));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let (_temp, app) = state();
        let result = read_file(State(app), identity("bob"), path_query(Some("ghost.txt"))).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mkdir_recursive() {
        let (_temp, app) = state();
        mkdir(
            State(app.clone()),
            identity("alice"),
            path_query(Some("/docs/deep")),
            Some(Json(MkdirOptions { recursive: true })),
        )
        .await
        .unwrap();
        assert!(app.gateway.root().join("docs/deep").is_dir());
    }

    #[tokio::test]
    async fn test_mkdir_default_is_non_recursive() {
        let (_temp, app) = state();
        let result = mkdir(
            State(app),
            identity("alice"),
            path_query(Some("/docs/deep")),
            None,
        )
        .await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mkdir_requires_write_permission() {
        let (_temp, app) = state();
        let result = mkdir(
            State(app.clone()),
            identity("bob"),
            path_query(Some("/docs")),
            None,
        )
        .await;
        assert!(matches!(result, Err(ApiError::Forbidden)));
        assert!(!app.gateway.root().join("docs").exists());
    }
}
