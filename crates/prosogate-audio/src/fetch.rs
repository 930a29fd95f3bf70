use prosogate_core::FetchError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

// Some audio hosts reject requests without a browser-looking agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Download the source audio into `dir`, streaming chunks to disk.
///
/// Fails fast on a non-2xx upstream response with the status and body so
/// the caller can surface them before any session starts. The returned
/// path carries a UUID prefix so concurrent requests for the same URL
/// never collide.
pub async fn download(
    client: &reqwest::Client,
    url: &str,
    dir: &Path,
) -> Result<PathBuf, FetchError> {
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::UpstreamStatus {
            status: status.as_u16(),
            body,
        });
    }

    tokio::fs::create_dir_all(dir).await?;
    let target = dir.join(format!("{}_{}", Uuid::new_v4(), basename_of(url)));
    let mut file = tokio::fs::File::create(&target).await?;

    let mut response = response;
    match stream_body(&mut response, &mut file).await {
        Ok(written) => {
            tracing::debug!(url, bytes = written, path = %target.display(), "audio downloaded");
            Ok(target)
        }
        Err(e) => {
            // No session worker exists yet, so the partial file must go here.
            drop(file);
            if let Err(rm) = tokio::fs::remove_file(&target).await {
                tracing::warn!(path = %target.display(), "failed to remove partial download: {rm}");
            }
            Err(e)
        }
    }
}

async fn stream_body(
    response: &mut reqwest::Response,
    file: &mut tokio::fs::File,
) -> Result<u64, FetchError> {
    let mut written = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Last path segment of the URL, with any query or fragment stripped.
fn basename_of(url: &str) -> &str {
    let name = url
        .rsplit('/')
        .next()
        .unwrap_or("")
        .split(['?', '#'])
        .next()
        .unwrap_or("");
    if name.is_empty() {
        "audio"
    } else {
        name
    }
}
