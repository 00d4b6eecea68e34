//! The LeRobot v2.1 dataset layout.
//!
//! A dataset directory contains
//! - `meta/info.json` with the schema and running totals,
//! - `meta/episodes.jsonl`, `meta/episodes_stats.jsonl` and `meta/tasks.jsonl`,
//! - one parquet file per episode under `data/`, with the PNG bytes of each
//!   image embedded as a `{bytes, path}` struct,
//! - one PNG file per frame and camera under `images/`.

use crate::{
    common::*,
    frame::Frame,
    image_writer::ImageWriter,
    schema::{
        default_features, DType, Feature, ACTIONS_KEY, ACTION_DIM, GRIPPER_IMAGE_KEY, IMAGE_KEYS,
        MOUNT_IMAGE_KEY, STATE_DIM, STATE_KEY,
    },
    stats::{FeatureStats, RunningStats},
};
use arrow::{
    array::{
        ArrayRef, BinaryArray, FixedSizeListArray, Float32Array, Int64Array, StringArray,
        StructArray,
    },
    datatypes::{DataType, Field, Float32Type},
    record_batch::RecordBatch,
};
use parquet::arrow::ArrowWriter;

pub const CODEBASE_VERSION: &str = "v2.1";
pub const DEFAULT_CHUNKS_SIZE: usize = 1000;
pub const DEFAULT_DATA_PATH: &str =
    "data/chunk-{episode_chunk:03d}/episode_{episode_index:06d}.parquet";
pub const DEFAULT_IMAGE_PATH: &str =
    "images/{image_key}/episode_{episode_index:06d}/frame_{frame_index:06d}.png";

const INFO_FILE: &str = "meta/info.json";
const EPISODES_FILE: &str = "meta/episodes.jsonl";
const EPISODES_STATS_FILE: &str = "meta/episodes_stats.jsonl";
const TASKS_FILE: &str = "meta/tasks.jsonl";

/// The local dataset root, `$HF_LEROBOT_HOME` or `~/.cache/huggingface/lerobot`.
pub fn lerobot_home() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("HF_LEROBOT_HOME") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = env::var_os("HF_HOME") {
        return Ok(PathBuf::from(dir).join("lerobot"));
    }
    let home = env::var_os("HOME")
        .ok_or_else(|| format_err!("neither HF_LEROBOT_HOME nor HOME is set"))?;
    Ok(PathBuf::from(home)
        .join(".cache")
        .join("huggingface")
        .join("lerobot"))
}

/// The content of `meta/info.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeRobotDatasetInfo {
    pub codebase_version: String,
    pub robot_type: String,
    pub total_episodes: usize,
    pub total_frames: usize,
    pub total_tasks: usize,
    pub total_videos: usize,
    pub total_chunks: usize,
    pub chunks_size: usize,
    pub fps: usize,
    pub splits: IndexMap<String, String>,
    pub data_path: String,
    pub video_path: Option<String>,
    pub image_path: Option<String>,
    pub features: IndexMap<String, Feature>,
}

impl LeRobotDatasetInfo {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        );
        let info = serde_json::from_reader(reader)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(info)
    }

    pub fn chunk_index(&self, episode_index: usize) -> usize {
        episode_index / self.chunks_size
    }

    pub fn episode_data_path(&self, episode_index: usize) -> PathBuf {
        let chunk = self.chunk_index(episode_index);
        self.data_path
            .replace("{episode_chunk:03d}", &format!("{:03}", chunk))
            .replace("{episode_index:06d}", &format!("{:06}", episode_index))
            .into()
    }

    pub fn frame_image_path(
        &self,
        image_key: &str,
        episode_index: usize,
        frame_index: usize,
    ) -> PathBuf {
        self.image_path
            .as_deref()
            .unwrap_or(DEFAULT_IMAGE_PATH)
            .replace("{image_key}", image_key)
            .replace("{episode_index:06d}", &format!("{:06}", episode_index))
            .replace("{frame_index:06d}", &format!("{:06}", frame_index))
            .into()
    }

    /// Names of the features stored as images.
    pub fn image_keys(&self) -> impl Iterator<Item = &str> {
        self.features
            .iter()
            .filter(|(_, feature)| feature.dtype == DType::Image)
            .map(|(key, _)| key.as_str())
    }
}

/// A line of `meta/episodes.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeRobotDatasetEpisode {
    pub episode_index: usize,
    pub tasks: Vec<String>,
    pub length: usize,
}

/// A line of `meta/episodes_stats.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeRobotDatasetEpisodeStats {
    pub episode_index: usize,
    pub stats: IndexMap<String, FeatureStats>,
}

/// A line of `meta/tasks.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeRobotDatasetTask {
    pub task_index: usize,
    pub task: String,
}

/// The metadata of a saved dataset.
#[derive(Debug, Clone)]
pub struct LeRobotDatasetMetadata {
    pub info: LeRobotDatasetInfo,
    pub episodes: Vec<LeRobotDatasetEpisode>,
    pub episodes_stats: Vec<LeRobotDatasetEpisodeStats>,
    pub tasks: Vec<LeRobotDatasetTask>,
}

impl LeRobotDatasetMetadata {
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let info = LeRobotDatasetInfo::load(root.join(INFO_FILE))?;
        let episodes = load_jsonl_file(root.join(EPISODES_FILE))?;
        let episodes_stats = load_jsonl_file(root.join(EPISODES_STATS_FILE))?;
        let tasks = load_jsonl_file(root.join(TASKS_FILE))?;

        Ok(Self {
            info,
            episodes,
            episodes_stats,
            tasks,
        })
    }
}

/// Dataset creation options.
#[derive(Debug, Clone)]
pub struct LeRobotDatasetInit {
    /// The dataset directory. It must not exist.
    pub root: PathBuf,
    pub robot_type: String,
    pub fps: usize,
    /// The user-facing features. Bookkeeping features are appended.
    pub features: IndexMap<String, Feature>,
    /// The number of image writer threads. It defaults to the number of CPUs.
    pub image_writer_threads: Option<usize>,
}

impl LeRobotDatasetInit {
    /// Create an empty dataset on disk.
    pub fn create(self) -> Result<LeRobotDataset> {
        let Self {
            root,
            robot_type,
            fps,
            features,
            image_writer_threads,
        } = self;

        ensure!(fps > 0, "fps must be positive");
        ensure!(
            !root.exists(),
            "dataset directory {} already exists",
            root.display()
        );
        ensure!(
            features.get(STATE_KEY).map(|feature| &feature.shape) == Some(&vec![STATE_DIM]),
            "feature '{}' must have shape [{}]",
            STATE_KEY,
            STATE_DIM
        );
        ensure!(
            features.get(ACTIONS_KEY).map(|feature| &feature.shape) == Some(&vec![ACTION_DIM]),
            "feature '{}' must have shape [{}]",
            ACTIONS_KEY,
            ACTION_DIM
        );

        let mut all_features = features;
        for (key, feature) in default_features() {
            ensure!(
                !all_features.contains_key(&key),
                "feature name '{}' is reserved",
                key
            );
            all_features.insert(key, feature);
        }

        let has_images = all_features
            .values()
            .any(|feature| feature.dtype == DType::Image);
        let info = LeRobotDatasetInfo {
            codebase_version: CODEBASE_VERSION.to_string(),
            robot_type,
            total_episodes: 0,
            total_frames: 0,
            total_tasks: 0,
            total_videos: 0,
            total_chunks: 0,
            chunks_size: DEFAULT_CHUNKS_SIZE,
            fps,
            splits: IndexMap::new(),
            data_path: DEFAULT_DATA_PATH.to_string(),
            video_path: None,
            image_path: has_images.then(|| DEFAULT_IMAGE_PATH.to_string()),
            features: all_features,
        };

        fs::create_dir_all(root.join("meta"))
            .with_context(|| format!("failed to create dataset directory {}", root.display()))?;
        File::create(root.join(EPISODES_FILE))?;
        File::create(root.join(EPISODES_STATS_FILE))?;

        let image_writer =
            ImageWriter::new(image_writer_threads.unwrap_or_else(num_cpus::get).max(1))?;

        let dataset = LeRobotDataset {
            root,
            info,
            tasks: IndexSet::new(),
            image_writer,
            buffer: vec![],
            image_stats: IndexMap::new(),
        };
        dataset.write_info()?;
        dataset.write_tasks()?;

        info!("created dataset at {}", dataset.root.display());
        Ok(dataset)
    }
}

#[derive(Debug)]
struct FrameRow {
    state: [f32; STATE_DIM],
    actions: [f32; ACTION_DIM],
    task_index: usize,
    image_paths: Vec<String>,
}

/// A dataset that is being written episode by episode.
#[derive(Debug)]
pub struct LeRobotDataset {
    root: PathBuf,
    info: LeRobotDatasetInfo,
    tasks: IndexSet<String>,
    image_writer: ImageWriter,
    buffer: Vec<FrameRow>,
    image_stats: IndexMap<String, RunningStats>,
}

impl LeRobotDataset {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn info(&self) -> &LeRobotDatasetInfo {
        &self.info
    }

    pub fn num_episodes(&self) -> usize {
        self.info.total_episodes
    }

    pub fn num_frames(&self) -> usize {
        self.info.total_frames
    }

    /// The number of frames added to the unsaved episode.
    pub fn num_buffered_frames(&self) -> usize {
        self.buffer.len()
    }

    /// Append a frame to the current episode.
    ///
    /// Images are queued to the image writer and persisted asynchronously.
    pub fn add_frame(&mut self, frame: Frame) -> Result<()> {
        let episode_index = self.info.total_episodes;
        let frame_index = self.buffer.len();

        for (key, image) in frame.images() {
            let feature = self
                .info
                .features
                .get(key)
                .ok_or_else(|| format_err!("feature '{}' is not declared", key))?;
            let expect = feature
                .image_size()
                .ok_or_else(|| format_err!("feature '{}' is not an image", key))?;
            ensure!(
                image.dimensions() == expect,
                "feature '{}' expects {}x{} images, but found {}x{}",
                key,
                expect.0,
                expect.1,
                image.width(),
                image.height()
            );
        }

        let Frame {
            mount_image,
            gripper_image,
            state,
            actions,
            task,
        } = frame;

        for (key, image) in [(MOUNT_IMAGE_KEY, &mount_image), (GRIPPER_IMAGE_KEY, &gripper_image)] {
            self.image_stats
                .entry(key.to_string())
                .or_insert_with(RunningStats::image)
                .push_image(image)?;
        }

        let task_index = self.tasks.insert_full(task).0;

        let mut image_paths = Vec::with_capacity(IMAGE_KEYS.len());
        for (key, image) in [(MOUNT_IMAGE_KEY, mount_image), (GRIPPER_IMAGE_KEY, gripper_image)] {
            let rel_path = self.info.frame_image_path(key, episode_index, frame_index);
            self.image_writer.submit(image, self.root.join(&rel_path))?;
            image_paths.push(rel_path.to_string_lossy().into_owned());
        }

        self.buffer.push(FrameRow {
            state,
            actions,
            task_index,
            image_paths,
        });
        Ok(())
    }

    /// Persist the current episode and start a new one.
    pub fn save_episode(&mut self) -> Result<()> {
        ensure!(
            !self.buffer.is_empty(),
            "cannot save an episode without frames"
        );

        let episode_index = self.info.total_episodes;
        let rows = mem::take(&mut self.buffer);
        let image_stats = mem::take(&mut self.image_stats);
        let length = rows.len();

        self.image_writer
            .wait()
            .with_context(|| format!("failed to write images of episode {}", episode_index))?;

        // write frame table
        let batch = self.episode_batch(episode_index, &rows)?;
        let data_path = self.root.join(self.info.episode_data_path(episode_index));
        if let Some(dir) = data_path.parent() {
            fs::create_dir_all(dir)?;
        }
        {
            let file = File::create(&data_path)
                .with_context(|| format!("failed to create {}", data_path.display()))?;
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(&batch)?;
            writer.close()?;
        }

        // update metadata
        let episode = LeRobotDatasetEpisode {
            episode_index,
            tasks: rows
                .iter()
                .map(|row| row.task_index)
                .unique()
                .map(|index| self.tasks[index].clone())
                .collect(),
            length,
        };
        let episode_stats = LeRobotDatasetEpisodeStats {
            episode_index,
            stats: self.episode_stats(episode_index, &rows, image_stats)?,
        };
        append_jsonl_line(self.root.join(EPISODES_FILE), &episode)?;
        append_jsonl_line(self.root.join(EPISODES_STATS_FILE), &episode_stats)?;

        let info = &mut self.info;
        info.total_episodes += 1;
        info.total_frames += length;
        info.total_tasks = self.tasks.len();
        info.total_chunks = info.chunk_index(info.total_episodes - 1) + 1;
        info.splits
            .insert("train".to_string(), format!("0:{}", info.total_episodes));

        self.write_tasks()?;
        self.write_info()?;

        debug!(
            "saved episode {} with {} frames to {}",
            episode_index,
            length,
            data_path.display()
        );
        Ok(())
    }

    fn timestamp(&self, frame_index: usize) -> f32 {
        frame_index as f32 / self.info.fps as f32
    }

    /// The statistics of every non-string feature, in declaration order.
    fn episode_stats(
        &self,
        episode_index: usize,
        rows: &[FrameRow],
        mut image_stats: IndexMap<String, RunningStats>,
    ) -> Result<IndexMap<String, FeatureStats>> {
        let first_index = self.info.total_frames;
        let mut stats = IndexMap::new();

        for (key, feature) in &self.info.features {
            let running = match feature.dtype {
                DType::String => continue,
                DType::Image | DType::Video => image_stats
                    .remove(key)
                    .ok_or_else(|| format_err!("no images were added for '{}'", key))?,
                _ => {
                    let mut running = RunningStats::vector(feature.shape.iter().product());
                    for (frame_index, row) in rows.iter().enumerate() {
                        let values: Vec<f64> = match key.as_str() {
                            STATE_KEY => row.state.iter().map(|&value| value as f64).collect(),
                            ACTIONS_KEY => row.actions.iter().map(|&value| value as f64).collect(),
                            "timestamp" => vec![self.timestamp(frame_index) as f64],
                            "frame_index" => vec![frame_index as f64],
                            "episode_index" => vec![episode_index as f64],
                            "index" => vec![(first_index + frame_index) as f64],
                            "task_index" => vec![row.task_index as f64],
                            _ => bail!("no values for feature '{}'", key),
                        };
                        running.push(&values)?;
                    }
                    running
                }
            };
            stats.insert(key.clone(), running.finish()?);
        }

        Ok(stats)
    }

    /// Builds the `{bytes, path}` image column from the written PNG files.
    fn image_column(&self, rows: &[FrameRow], nth: usize) -> Result<StructArray> {
        let mut contents = Vec::with_capacity(rows.len());
        let mut names = Vec::with_capacity(rows.len());

        for row in rows {
            let rel_path = Path::new(&row.image_paths[nth]);
            let path = self.root.join(rel_path);
            let bytes =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let name = rel_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            contents.push(bytes);
            names.push(name);
        }

        let bytes = BinaryArray::from_iter_values(contents.iter());
        let paths = StringArray::from_iter_values(names.iter());
        Ok(StructArray::from(vec![
            (
                Arc::new(Field::new("bytes", DataType::Binary, true)),
                Arc::new(bytes) as ArrayRef,
            ),
            (
                Arc::new(Field::new("path", DataType::Utf8, true)),
                Arc::new(paths) as ArrayRef,
            ),
        ]))
    }

    fn episode_batch(&self, episode_index: usize, rows: &[FrameRow]) -> Result<RecordBatch> {
        let first_index = self.info.total_frames;
        let mut columns: Vec<(&str, ArrayRef)> = vec![];
        for (nth, &key) in IMAGE_KEYS.iter().enumerate() {
            let images = self.image_column(rows, nth)?;
            columns.push((key, Arc::new(images) as ArrayRef));
        }

        let state = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            rows.iter().map(|row| Some(row.state.map(Some))),
            STATE_DIM as i32,
        );
        let actions = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            rows.iter().map(|row| Some(row.actions.map(Some))),
            ACTION_DIM as i32,
        );
        let timestamp: Float32Array = (0..rows.len())
            .map(|frame_index| self.timestamp(frame_index))
            .collect();
        let frame_index: Int64Array = (0..rows.len() as i64).collect();
        let episode_index: Int64Array = iter::repeat(episode_index as i64)
            .take(rows.len())
            .collect();
        let index: Int64Array = (0..rows.len())
            .map(|frame_index| (first_index + frame_index) as i64)
            .collect();
        let task_index: Int64Array = rows.iter().map(|row| row.task_index as i64).collect();

        columns.extend([
            (STATE_KEY, Arc::new(state) as ArrayRef),
            (ACTIONS_KEY, Arc::new(actions) as ArrayRef),
            ("timestamp", Arc::new(timestamp) as ArrayRef),
            ("frame_index", Arc::new(frame_index) as ArrayRef),
            ("episode_index", Arc::new(episode_index) as ArrayRef),
            ("index", Arc::new(index) as ArrayRef),
            ("task_index", Arc::new(task_index) as ArrayRef),
        ]);

        Ok(RecordBatch::try_from_iter(columns)?)
    }

    fn write_info(&self) -> Result<()> {
        let path = self.root.join(INFO_FILE);
        let text = serde_json::to_string_pretty(&self.info)?;
        fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    fn write_tasks(&self) -> Result<()> {
        let path = self.root.join(TASKS_FILE);
        let mut writer = BufWriter::new(File::create(&path)?);
        for (task_index, task) in self.tasks.iter().enumerate() {
            let line = LeRobotDatasetTask {
                task_index,
                task: task.clone(),
            };
            writeln!(writer, "{}", serde_json::to_string(&line)?)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn append_jsonl_line<S>(path: impl AsRef<Path>, line: &S) -> Result<()>
where
    S: Serialize,
{
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    writeln!(file, "{}", serde_json::to_string(line)?)?;
    Ok(())
}

fn load_jsonl_file<D>(path: impl AsRef<Path>) -> Result<Vec<D>>
where
    D: DeserializeOwned,
{
    let path = path.as_ref();
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let entries = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .with_context(|| format!("failed to parse a line in {}", path.display()))
        })
        .try_collect()?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::collab_features;
    use arrow::array::Array as _;
    use image::Rgb;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn dataset_init(root: PathBuf) -> LeRobotDatasetInit {
        LeRobotDatasetInit {
            root,
            robot_type: "xarm6".to_string(),
            fps: 10,
            features: collab_features(8, 6),
            image_writer_threads: Some(2),
        }
    }

    fn frame(step: usize, task: &str) -> Frame {
        Frame {
            mount_image: RgbImage::from_pixel(8, 6, Rgb([step as u8, 1, 2])),
            gripper_image: RgbImage::from_pixel(8, 6, Rgb([3, step as u8, 4])),
            state: [step as f32; STATE_DIM],
            actions: [-(step as f32); ACTION_DIM],
            task: task.to_string(),
        }
    }

    #[test]
    fn write_dataset_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("local").join("collab");
        let mut dataset = dataset_init(root.clone()).create()?;

        for step in 0..3 {
            dataset.add_frame(frame(step, "hand over"))?;
        }
        assert_eq!(dataset.num_buffered_frames(), 3);
        dataset.save_episode()?;

        for step in 0..2 {
            dataset.add_frame(frame(step, "pick up"))?;
        }
        dataset.save_episode()?;
        assert_eq!(dataset.num_episodes(), 2);
        assert_eq!(dataset.num_frames(), 5);
        drop(dataset);

        let meta = LeRobotDatasetMetadata::load(&root)?;
        assert_eq!(meta.info.total_episodes, 2);
        assert_eq!(meta.info.total_frames, 5);
        assert_eq!(meta.info.total_tasks, 2);
        assert_eq!(meta.info.total_chunks, 1);
        assert_eq!(meta.info.splits["train"], "0:2");
        assert_eq!(meta.info.robot_type, "xarm6");
        assert_eq!(
            meta.info.image_keys().collect::<Vec<_>>(),
            ["mount_image", "gripper_image"]
        );
        assert!(meta.info.features.contains_key("frame_index"));
        assert_eq!(
            meta.episodes,
            [
                LeRobotDatasetEpisode {
                    episode_index: 0,
                    tasks: vec!["hand over".to_string()],
                    length: 3,
                },
                LeRobotDatasetEpisode {
                    episode_index: 1,
                    tasks: vec!["pick up".to_string()],
                    length: 2,
                },
            ]
        );
        assert_eq!(meta.tasks[1].task, "pick up");

        // frame table
        let data_path = root.join("data/chunk-000/episode_000001.parquet");
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(File::open(data_path)?)?.build()?;
        let batch = reader.next().unwrap()?;
        assert_eq!(batch.num_rows(), 2);
        let index = batch
            .column_by_name("index")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(index.values().to_vec(), [3, 4]);
        let timestamp = batch
            .column_by_name("timestamp")
            .unwrap()
            .as_any()
            .downcast_ref::<Float32Array>()
            .unwrap();
        approx::assert_abs_diff_eq!(timestamp.value(1), 0.1);
        let state = batch
            .column_by_name("state")
            .unwrap()
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .unwrap();
        assert_eq!(state.value_length(), 8);
        let images = batch
            .column_by_name("gripper_image")
            .unwrap()
            .as_any()
            .downcast_ref::<StructArray>()
            .unwrap();
        let paths = images
            .column_by_name("path")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(paths.value(1), "frame_000001.png");
        let bytes = images
            .column_by_name("bytes")
            .unwrap()
            .as_any()
            .downcast_ref::<BinaryArray>()
            .unwrap();
        let embedded = image::load_from_memory(bytes.value(1))?.into_rgb8();
        assert_eq!(embedded.get_pixel(0, 0), &Rgb([3, 1, 4]));

        // episode statistics
        assert_eq!(meta.episodes_stats.len(), 2);
        let stats = &meta.episodes_stats[0];
        assert_eq!(stats.episode_index, 0);
        let keys: Vec<_> = stats.stats.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "mount_image",
                "gripper_image",
                "state",
                "actions",
                "timestamp",
                "frame_index",
                "episode_index",
                "index",
                "task_index"
            ]
        );
        assert_eq!(stats.stats["state"].min.to_vec(), [0.0; 8]);
        assert_eq!(stats.stats["state"].max.to_vec(), [2.0; 8]);
        assert_eq!(stats.stats["actions"].mean.to_vec(), [-1.0; 8]);
        assert_eq!(stats.stats["frame_index"].count, [3]);
        assert_eq!(stats.stats["index"].max.to_vec(), [2.0]);
        assert_eq!(meta.episodes_stats[1].stats["index"].min.to_vec(), [3.0]);
        let mount = &stats.stats["mount_image"];
        assert_eq!(mount.count, [3]);
        assert_eq!(mount.max.to_vec(), [2.0 / 255.0, 1.0 / 255.0, 2.0 / 255.0]);

        // frame images
        let image_path = root.join("images/gripper_image/episode_000000/frame_000002.png");
        let image = image::open(image_path)?.into_rgb8();
        assert_eq!(image.get_pixel(0, 0), &Rgb([3, 2, 4]));
        Ok(())
    }

    #[test]
    fn existing_dataset_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(dataset_init(dir.path().to_owned()).create().is_err());
        Ok(())
    }

    #[test]
    fn empty_episode_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut dataset = dataset_init(dir.path().join("dataset")).create()?;
        assert!(dataset.save_episode().is_err());
        Ok(())
    }

    #[test]
    fn image_size_mismatch_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut dataset = dataset_init(dir.path().join("dataset")).create()?;
        let mut frame = frame(0, "task");
        frame.mount_image = RgbImage::new(6, 8);
        assert!(dataset.add_frame(frame).is_err());
        assert_eq!(dataset.num_buffered_frames(), 0);
        Ok(())
    }

    #[test]
    fn path_template_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let dataset = dataset_init(dir.path().join("dataset")).create()?;
        let info = dataset.info();
        assert_eq!(
            info.episode_data_path(1234),
            Path::new("data/chunk-001/episode_001234.parquet")
        );
        assert_eq!(
            info.frame_image_path("mount_image", 7, 42),
            Path::new("images/mount_image/episode_000007/frame_000042.png")
        );
        Ok(())
    }
}
