//! Bottle archive downloads from the OCI/GHCR registry: anonymous bearer token
//! acquisition, bounded-concurrency fan-out, progress reporting, and sha256
//! verification against the digest advertised by the formula API.

use crate::api::Formula;
use crate::cache::Cache;
use crate::error::{KegError, Result};
use crate::platform::MachineProfile;
use crate::store::Store;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;

const MAX_CONCURRENT_DOWNLOADS: usize = 8;

#[derive(Deserialize)]
struct GhcrToken {
    token: String,
}

async fn get_ghcr_token(repository: &str, cache: &Cache) -> Result<String> {
    if let Some(token) = cache.get_ghcr_token(repository) {
        return Ok(token);
    }
    let url = format!("https://ghcr.io/token?service=ghcr.io&scope=repository:{repository}:pull");
    let response: GhcrToken = reqwest::Client::new().get(&url).send().await?.json().await?;
    let _ = cache.store_ghcr_token(repository, &response.token);
    Ok(response.token)
}

pub async fn verify_checksum(file_path: &std::path::Path, expected: &str) -> Result<bool> {
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    let mut file = fs::File::open(file_path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; 8192];
    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    let checksum = format!("{:x}", hasher.finalize());
    Ok(checksum == expected)
}

/// Download one formula's bottle for the running platform. Returns the path to the
/// verified archive in the store's download directory. An existing archive whose
/// checksum still matches is reused without a network round-trip.
pub async fn download_bottle(
    store: &Store,
    cache: &Cache,
    formula: &Formula,
    profile: &MachineProfile,
    progress: Option<&MultiProgress>,
    client: &reqwest::Client,
) -> Result<PathBuf> {
    let bottle = formula
        .bottle
        .as_ref()
        .and_then(|b| b.stable.as_ref())
        .ok_or_else(|| KegError::Other(anyhow::anyhow!("no bottle available for {}", formula.name)))?;

    let platform_tag = crate::platform::detect_bottle_tag(profile).map_err(KegError::Other)?;
    let bottle_file = bottle
        .files
        .get(&platform_tag)
        .or_else(|| bottle.files.get("all"))
        .ok_or_else(|| {
            KegError::Other(anyhow::anyhow!(
                "no bottle for platform {platform_tag} (and no universal bottle)"
            ))
        })?;

    fs::create_dir_all(store.download_path()).await?;
    let output_path = store.download_archive_path(&formula.name, &platform_tag);

    if output_path.exists() && verify_checksum(&output_path, &bottle_file.sha256).await? {
        return Ok(output_path);
    }
    if output_path.exists() {
        fs::remove_file(&output_path).await?;
    }

    let pb = progress.map(|mp| {
        let pb = mp.add(ProgressBar::new(0));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("━━╸"));
        }
        pb.set_message(format!("Downloading {}", formula.name));
        pb
    });

    let repository = bottle_file
        .url
        .strip_prefix("https://ghcr.io/v2/")
        .and_then(|s| s.split("/blobs/").next())
        .ok_or_else(|| KegError::Other(anyhow::anyhow!("unrecognized bottle URL: {}", bottle_file.url)))?;
    let token = get_ghcr_token(repository, cache).await?;

    let mut response = client
        .get(&bottle_file.url)
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await?;

    if let (Some(pb), Some(total)) = (&pb, response.content_length()) {
        pb.set_length(total);
    }

    let mut file = fs::File::create(&output_path).await?;
    let mut downloaded: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        if let Some(pb) = &pb {
            pb.set_position(downloaded);
        }
    }
    file.flush().await?;

    if let Some(pb) = &pb {
        pb.finish_with_message(format!("done {}", formula.name));
    }

    if !verify_checksum(&output_path, &bottle_file.sha256).await? {
        fs::remove_file(&output_path).await?;
        return Err(KegError::DigestMismatch {
            pkg: formula.name.clone(),
            expected: bottle_file.sha256.clone(),
            actual: "mismatch".to_string(),
        });
    }

    Ok(output_path)
}

/// Download multiple bottles with `MAX_CONCURRENT_DOWNLOADS` in flight at once. Order of
/// completion is not preserved; order of the returned vec matches `formulae`.
pub async fn download_bottles(
    store: &Store,
    cache: &Cache,
    formulae: &[Formula],
    profile: &MachineProfile,
    quiet: bool,
) -> Result<Vec<(String, PathBuf)>> {
    let mp = MultiProgress::new();
    let client = Arc::new(reqwest::Client::new());
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_DOWNLOADS));
    let store = store.clone();
    let cache = cache.clone();
    let profile = profile.clone();

    let mut tasks = Vec::new();
    for formula in formulae {
        let formula = formula.clone();
        let mp = mp.clone();
        let sem = semaphore.clone();
        let client = client.clone();
        let store = store.clone();
        let cache = cache.clone();
        let profile = profile.clone();

        tasks.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.expect("semaphore closed");
            let progress = if quiet { None } else { Some(&mp) };
            let result = download_bottle(&store, &cache, &formula, &profile, progress, &client).await;
            (formula.name.clone(), result)
        }));
    }

    let mut results = Vec::new();
    for task in tasks {
        let (name, result) = task.await.map_err(|e| KegError::Other(anyhow::anyhow!(e)))?;
        results.push((name, result?));
    }
    Ok(results)
}
