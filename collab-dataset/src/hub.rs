//! One-shot upload of a finished dataset to the Hugging Face Hub.
//!
//! The upload follows the Hub commit protocol. The server first classifies
//! every file as regular or LFS in a preupload call. LFS files are uploaded
//! through the git-lfs batch API, and a single commit then references
//! them by hash, with regular files inlined as base64.

use crate::common::*;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use std::io::{Read as _, Seek as _, SeekFrom};

pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";
const SAMPLE_SIZE: usize = 512;
const BATCH_SIZE: usize = 256;
const LFS_CONTENT_TYPE: &str = "application/vnd.git-lfs+json";

/// Options of the uploaded dataset repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushOptions {
    pub tags: Vec<String>,
    pub private: bool,
    pub license: String,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            tags: vec![
                "collab".to_string(),
                "xarm6".to_string(),
                "pick-and-place".to_string(),
            ],
            private: false,
            license: "apache-2.0".to_string(),
        }
    }
}

/// A local file scheduled for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub path_in_repo: String,
    pub local_path: PathBuf,
    pub size: u64,
    /// Lowercase hex SHA-256 of the content.
    pub sha256: String,
    /// The leading bytes the server inspects to pick the upload mode.
    pub sample: Vec<u8>,
}

impl UploadFile {
    /// Hash the file in a streaming pass.
    pub fn open(local_path: impl AsRef<Path>, path_in_repo: impl Into<String>) -> Result<Self> {
        let local_path = local_path.as_ref();
        let mut reader = BufReader::new(
            File::open(local_path)
                .with_context(|| format!("failed to open {}", local_path.display()))?,
        );

        let mut hasher = Sha256::new();
        let mut sample = Vec::with_capacity(SAMPLE_SIZE);
        let mut size = 0u64;
        let mut buf = vec![0u8; 64 * 1024];

        loop {
            let len = reader.read(&mut buf)?;
            if len == 0 {
                break;
            }
            let chunk = &buf[..len];
            let remaining = SAMPLE_SIZE - sample.len();
            sample.extend_from_slice(&chunk[..remaining.min(len)]);
            hasher.update(chunk);
            size += len as u64;
        }

        Ok(Self {
            path_in_repo: path_in_repo.into(),
            local_path: local_path.to_owned(),
            size,
            sha256: format!("{:x}", hasher.finalize()),
            sample,
        })
    }
}

/// How the server wants a file to be transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    Regular,
    Lfs,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreuploadFile {
    path: String,
    upload_mode: UploadMode,
    #[serde(default)]
    should_ignore: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct PreuploadResponse {
    files: Vec<PreuploadFile>,
}

#[derive(Debug, Clone, Deserialize)]
struct LfsBatchResponse {
    objects: Vec<LfsObject>,
}

#[derive(Debug, Clone, Deserialize)]
struct LfsObject {
    oid: String,
    #[serde(default)]
    actions: Option<LfsActions>,
    #[serde(default)]
    error: Option<LfsError>,
}

#[derive(Debug, Clone, Deserialize)]
struct LfsActions {
    upload: Option<LfsAction>,
    verify: Option<LfsAction>,
}

#[derive(Debug, Clone, Deserialize)]
struct LfsAction {
    href: String,
    #[serde(default)]
    header: IndexMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LfsError {
    code: i64,
    message: String,
}

/// The minimal Hub API client.
#[derive(Debug, Clone)]
pub struct HubClient {
    endpoint: String,
    token: String,
    agent: ureq::Agent,
}

impl HubClient {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    /// Build a client from `HF_TOKEN` and the optional `HF_ENDPOINT`.
    pub fn from_env() -> Result<Self> {
        let token = env::var("HF_TOKEN")
            .or_else(|_| env::var("HUGGING_FACE_HUB_TOKEN"))
            .map_err(|_| format_err!("HF_TOKEN must be set to push to the hub"))?;
        let endpoint = env::var("HF_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Ok(Self::new(endpoint, token))
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Create the dataset repository. An existing repository is accepted.
    pub fn create_dataset_repo(&self, repo_id: &str, private: bool) -> Result<()> {
        let (organization, name) = split_repo_id(repo_id)?;
        let url = format!("{}/api/repos/create", self.endpoint);
        let body = serde_json::json!({
            "type": "dataset",
            "name": name,
            "organization": organization,
            "private": private,
        });

        match self
            .agent
            .post(&url)
            .set("Authorization", &self.authorization())
            .send_json(body)
        {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(409, _)) => {
                info!("dataset repository {} already exists", repo_id);
                Ok(())
            }
            Err(err) => {
                Err(err).with_context(|| format!("failed to create repository {}", repo_id))
            }
        }
    }

    /// Ask the server how each file must be uploaded.
    ///
    /// Files the server ignores are absent from the returned map.
    pub fn preupload(
        &self,
        repo_id: &str,
        files: &[UploadFile],
    ) -> Result<IndexMap<String, UploadMode>> {
        let url = format!("{}/api/datasets/{}/preupload/main", self.endpoint, repo_id);
        let mut modes = IndexMap::new();

        for batch in files.chunks(BATCH_SIZE) {
            let response: PreuploadResponse = self
                .agent
                .post(&url)
                .set("Authorization", &self.authorization())
                .send_json(preupload_payload(batch))
                .with_context(|| format!("failed to preupload files to {}", repo_id))?
                .into_json()?;

            for file in response.files {
                if file.should_ignore {
                    debug!("the hub ignores {}", file.path);
                    continue;
                }
                modes.insert(file.path, file.upload_mode);
            }
        }

        Ok(modes)
    }

    /// Upload file contents to LFS storage.
    pub fn upload_lfs(&self, repo_id: &str, files: &[&UploadFile]) -> Result<()> {
        let url = format!(
            "{}/datasets/{}.git/info/lfs/objects/batch",
            self.endpoint, repo_id
        );

        for batch in files.chunks(BATCH_SIZE) {
            let response: LfsBatchResponse = self
                .agent
                .post(&url)
                .set("Authorization", &self.authorization())
                .set("Accept", LFS_CONTENT_TYPE)
                .set("Content-Type", LFS_CONTENT_TYPE)
                .send_string(&serde_json::to_string(&lfs_batch_payload(batch))?)
                .with_context(|| format!("failed to request LFS upload to {}", repo_id))?
                .into_json()?;

            for object in response.objects {
                let file = batch
                    .iter()
                    .find(|file| file.sha256 == object.oid)
                    .ok_or_else(|| format_err!("unexpected LFS object {}", object.oid))?;
                if let Some(LfsError { code, message }) = object.error {
                    bail!(
                        "LFS rejected {} with code {}: {}",
                        file.path_in_repo,
                        code,
                        message
                    );
                }

                // objects without actions are already stored
                let LfsActions { upload, verify } = match object.actions {
                    Some(actions) => actions,
                    None => continue,
                };
                if let Some(upload) = upload {
                    self.upload_object(file, &upload)?;
                }
                if let Some(verify) = verify {
                    self.verify_object(file, &verify)?;
                }
            }
        }

        Ok(())
    }

    fn upload_object(&self, file: &UploadFile, action: &LfsAction) -> Result<()> {
        debug!("uploading {} to LFS", file.path_in_repo);

        if action.header.contains_key("chunk_size") {
            return self.upload_multipart(file, action);
        }

        let mut request = self.agent.put(&action.href);
        for (key, value) in &action.header {
            request = request.set(key, value);
        }
        request
            .send(File::open(&file.local_path)?)
            .with_context(|| format!("failed to upload {}", file.path_in_repo))?;
        Ok(())
    }

    fn upload_multipart(&self, file: &UploadFile, action: &LfsAction) -> Result<()> {
        let (chunk_size, part_urls) = multipart_urls(&action.header)?;

        let mut parts = vec![];
        for (nth, part_url) in part_urls.iter().enumerate() {
            let mut reader = File::open(&file.local_path)?;
            reader.seek(SeekFrom::Start(nth as u64 * chunk_size))?;
            let response = self
                .agent
                .put(part_url)
                .send(reader.take(chunk_size))
                .with_context(|| {
                    format!("failed to upload part {} of {}", nth + 1, file.path_in_repo)
                })?;
            let etag = response.header("etag").ok_or_else(|| {
                format_err!("missing etag for part {} of {}", nth + 1, file.path_in_repo)
            })?;
            parts.push(serde_json::json!({ "partNumber": nth + 1, "etag": etag }));
        }

        self.agent
            .post(&action.href)
            .set("Authorization", &self.authorization())
            .set("Accept", LFS_CONTENT_TYPE)
            .send_json(serde_json::json!({ "oid": file.sha256, "parts": parts }))
            .with_context(|| format!("failed to complete upload of {}", file.path_in_repo))?;
        Ok(())
    }

    fn verify_object(&self, file: &UploadFile, action: &LfsAction) -> Result<()> {
        let mut request = self
            .agent
            .post(&action.href)
            .set("Authorization", &self.authorization());
        for (key, value) in &action.header {
            request = request.set(key, value);
        }
        request
            .send_json(serde_json::json!({ "oid": file.sha256, "size": file.size }))
            .with_context(|| format!("failed to verify upload of {}", file.path_in_repo))?;
        Ok(())
    }

    /// Commit the files to the main branch.
    ///
    /// LFS files must have been uploaded before.
    pub fn commit(
        &self,
        repo_id: &str,
        summary: &str,
        files: &[(&UploadFile, UploadMode)],
    ) -> Result<()> {
        let url = format!("{}/api/datasets/{}/commit/main", self.endpoint, repo_id);
        let body = commit_payload(summary, files)?;

        self.agent
            .post(&url)
            .set("Authorization", &self.authorization())
            .set("Content-Type", "application/x-ndjson")
            .send_string(&body)
            .with_context(|| format!("failed to commit files to {}", repo_id))?;
        Ok(())
    }
}

/// Upload a dataset directory with a generated dataset card.
pub fn push_to_hub(
    client: &HubClient,
    dataset_dir: impl AsRef<Path>,
    repo_id: &str,
    options: &PushOptions,
) -> Result<()> {
    let dataset_dir = dataset_dir.as_ref();

    fs::write(dataset_dir.join("README.md"), dataset_card(options))?;
    let files = collect_files(dataset_dir)?;
    info!(
        "uploading {} files from {} to {}",
        files.len(),
        dataset_dir.display(),
        repo_id
    );

    client.create_dataset_repo(repo_id, options.private)?;
    let modes = client.preupload(repo_id, &files)?;
    let operations: Vec<_> = files
        .iter()
        .filter_map(|file| Some((file, *modes.get(&file.path_in_repo)?)))
        .collect();

    let lfs_files: Vec<_> = operations
        .iter()
        .filter(|(_, mode)| *mode == UploadMode::Lfs)
        .map(|&(file, _)| file)
        .collect();
    info!("{} files go to LFS storage", lfs_files.len());
    client.upload_lfs(repo_id, &lfs_files)?;
    client.commit(repo_id, "Upload dataset", &operations)?;

    info!("pushed dataset to {}", repo_id);
    Ok(())
}

/// The `README.md` front matter that declares license and tags.
pub fn dataset_card(options: &PushOptions) -> String {
    let PushOptions { tags, license, .. } = options;
    let tags: String = iter::once("LeRobot")
        .chain(tags.iter().map(String::as_str))
        .map(|tag| format!("- {}\n", tag))
        .collect();

    format!(
        "---\n\
         license: {}\n\
         task_categories:\n\
         - robotics\n\
         tags:\n\
         {}\
         configs:\n\
         - config_name: default\n  data_files: data/*/*.parquet\n\
         ---\n\n\
         This dataset was converted from Collab xArm episode recordings.\n",
        license, tags
    )
}

fn split_repo_id(repo_id: &str) -> Result<(Option<&str>, &str)> {
    let parts: Vec<_> = repo_id.split('/').collect();
    match *parts.as_slice() {
        [name] if !name.is_empty() => Ok((None, name)),
        [organization, name] if !organization.is_empty() && !name.is_empty() => {
            Ok((Some(organization), name))
        }
        _ => bail!("invalid repository id '{}'", repo_id),
    }
}

/// Hash every file under `dir`, one file at a time.
fn collect_files(dir: &Path) -> Result<Vec<UploadFile>> {
    let pattern = dir.join("**").join("*");
    let pattern = pattern
        .to_str()
        .ok_or_else(|| format_err!("non-unicode path '{}'", dir.display()))?;

    let mut files = vec![];
    for path in glob::glob(pattern)? {
        let path = path?;
        if !path.is_file() {
            continue;
        }
        let rel_path = path
            .strip_prefix(dir)?
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .join("/");
        files.push(UploadFile::open(&path, rel_path)?);
    }
    files.sort_by(|lhs, rhs| lhs.path_in_repo.cmp(&rhs.path_in_repo));
    Ok(files)
}

fn preupload_payload(files: &[UploadFile]) -> serde_json::Value {
    let files: Vec<_> = files
        .iter()
        .map(|file| {
            serde_json::json!({
                "path": file.path_in_repo,
                "sample": base64::engine::general_purpose::STANDARD.encode(&file.sample),
                "size": file.size,
            })
        })
        .collect();
    serde_json::json!({ "files": files })
}

fn lfs_batch_payload(files: &[&UploadFile]) -> serde_json::Value {
    let objects: Vec<_> = files
        .iter()
        .map(|file| serde_json::json!({ "oid": file.sha256, "size": file.size }))
        .collect();
    serde_json::json!({
        "operation": "upload",
        "transfers": ["basic", "multipart"],
        "objects": objects,
        "hash_algo": "sha256",
        "ref": { "name": "main" },
    })
}

/// The part size and the part URLs, ordered by part number.
fn multipart_urls(header: &IndexMap<String, String>) -> Result<(u64, Vec<String>)> {
    let chunk_size: u64 = header
        .get("chunk_size")
        .ok_or_else(|| format_err!("missing chunk_size in multipart upload"))?
        .parse()
        .context("invalid chunk_size in multipart upload")?;
    ensure!(chunk_size > 0, "chunk_size must be positive");

    let urls: Vec<_> = header
        .iter()
        .filter_map(|(key, url)| Some((key.parse::<usize>().ok()?, url.clone())))
        .sorted_by_key(|(part, _)| *part)
        .map(|(_, url)| url)
        .collect();
    ensure!(!urls.is_empty(), "no part URLs in multipart upload");
    Ok((chunk_size, urls))
}

/// The NDJSON commit body. Regular files are read here one by one.
fn commit_payload(summary: &str, files: &[(&UploadFile, UploadMode)]) -> Result<String> {
    let header = serde_json::json!({
        "key": "header",
        "value": { "summary": summary, "description": "" },
    });
    let mut lines = vec![serde_json::to_string(&header)?];

    for &(file, mode) in files {
        let line = match mode {
            UploadMode::Regular => {
                let content = fs::read(&file.local_path)
                    .with_context(|| format!("failed to read {}", file.local_path.display()))?;
                serde_json::json!({
                    "key": "file",
                    "value": {
                        "path": file.path_in_repo,
                        "content": base64::engine::general_purpose::STANDARD.encode(content),
                        "encoding": "base64",
                    },
                })
            }
            UploadMode::Lfs => serde_json::json!({
                "key": "lfsFile",
                "value": {
                    "path": file.path_in_repo,
                    "algo": "sha256",
                    "oid": file.sha256,
                    "size": file.size,
                },
            }),
        };
        lines.push(serde_json::to_string(&line)?);
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn split_repo_id_test() -> Result<()> {
        assert_eq!(split_repo_id("local/collab")?, (Some("local"), "collab"));
        assert_eq!(split_repo_id("collab")?, (None, "collab"));
        assert!(split_repo_id("a/b/c").is_err());
        assert!(split_repo_id("/collab").is_err());
        assert!(split_repo_id("").is_err());
        Ok(())
    }

    #[test]
    fn dataset_card_test() {
        let card = dataset_card(&PushOptions::default());
        assert!(card.starts_with("---\nlicense: apache-2.0\n"));
        assert!(card.contains("tags:\n- LeRobot\n- collab\n- xarm6\n- pick-and-place\n"));
        assert!(card.contains("  data_files: data/*/*.parquet\n---\n"));
    }

    #[test]
    fn upload_file_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("hello.txt");
        fs::write(&path, "hello")?;

        let file = UploadFile::open(&path, "hello.txt")?;
        assert_eq!(file.size, 5);
        assert_eq!(file.sha256, HELLO_SHA256);
        assert_eq!(file.sample, b"hello");

        let large = dir.path().join("large.bin");
        fs::write(&large, vec![7u8; 100_000])?;
        let file = UploadFile::open(&large, "large.bin")?;
        assert_eq!(file.size, 100_000);
        assert_eq!(file.sample.len(), SAMPLE_SIZE);
        Ok(())
    }

    #[test]
    fn commit_payload_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("meta"))?;
        fs::create_dir_all(dir.path().join("data"))?;
        fs::write(dir.path().join("meta/info.json"), "{}")?;
        fs::write(dir.path().join("data/episode.parquet"), "hello")?;

        let files = collect_files(dir.path())?;
        let operations = [
            (&files[0], UploadMode::Lfs),
            (&files[1], UploadMode::Regular),
        ];
        let payload = commit_payload("Upload dataset", &operations)?;
        let lines: Vec<serde_json::Value> = payload
            .lines()
            .map(serde_json::from_str)
            .try_collect()?;

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["key"], "header");
        assert_eq!(lines[0]["value"]["summary"], "Upload dataset");

        assert_eq!(lines[1]["key"], "lfsFile");
        assert_eq!(lines[1]["value"]["path"], "data/episode.parquet");
        assert_eq!(lines[1]["value"]["oid"], HELLO_SHA256);
        assert_eq!(lines[1]["value"]["size"], 5);
        assert!(lines[1]["value"].get("content").is_none());

        assert_eq!(lines[2]["key"], "file");
        assert_eq!(lines[2]["value"]["path"], "meta/info.json");
        assert_eq!(lines[2]["value"]["content"], "e30=");
        Ok(())
    }

    #[test]
    fn preupload_payload_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("README.md"), "card")?;
        let files = collect_files(dir.path())?;

        let payload = preupload_payload(&files);
        assert_eq!(payload["files"][0]["path"], "README.md");
        assert_eq!(payload["files"][0]["sample"], "Y2FyZA==");
        assert_eq!(payload["files"][0]["size"], 4);

        let response: PreuploadResponse = serde_json::from_value(serde_json::json!({
            "files": [
                { "path": "README.md", "uploadMode": "regular", "shouldIgnore": false },
                { "path": "data/chunk-000/episode_000000.parquet", "uploadMode": "lfs" },
            ],
        }))?;
        assert_eq!(response.files[0].upload_mode, UploadMode::Regular);
        assert_eq!(response.files[1].upload_mode, UploadMode::Lfs);
        assert!(!response.files[1].should_ignore);
        Ok(())
    }

    #[test]
    fn lfs_batch_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("episode.parquet"), "hello")?;
        let files = collect_files(dir.path())?;
        let refs: Vec<_> = files.iter().collect();

        let payload = lfs_batch_payload(&refs);
        assert_eq!(payload["operation"], "upload");
        assert_eq!(payload["objects"][0]["oid"], HELLO_SHA256);
        assert_eq!(payload["objects"][0]["size"], 5);

        let response: LfsBatchResponse = serde_json::from_value(serde_json::json!({
            "objects": [{
                "oid": HELLO_SHA256,
                "size": 5,
                "actions": {
                    "upload": { "href": "https://upload.example/put", "header": { "x-amz-acl": "private" } },
                    "verify": { "href": "https://hub.example/verify" },
                },
            }],
        }))?;
        let actions = response.objects[0].actions.as_ref().unwrap();
        assert_eq!(actions.upload.as_ref().unwrap().header["x-amz-acl"], "private");
        assert!(actions.verify.as_ref().unwrap().header.is_empty());
        assert!(response.objects[0].error.is_none());
        Ok(())
    }

    #[test]
    fn multipart_urls_test() -> Result<()> {
        let header: IndexMap<String, String> = [
            ("chunk_size", "5242880"),
            ("00002", "https://upload.example/part2"),
            ("00001", "https://upload.example/part1"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

        let (chunk_size, urls) = multipart_urls(&header)?;
        assert_eq!(chunk_size, 5_242_880);
        assert_eq!(
            urls,
            ["https://upload.example/part1", "https://upload.example/part2"]
        );

        let mut header = header;
        header.insert("chunk_size".to_string(), "abc".to_string());
        assert!(multipart_urls(&header).is_err());
        Ok(())
    }
}
