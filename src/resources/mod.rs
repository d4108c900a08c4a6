//! Asynchronous asset loading.
//!
//! An [`AssetLoader`] fetches a glTF/GLB bundle through a [`Transport`], reports
//! download progress in percent and parses the result into an [`Asset`] with
//! its node hierarchy and animation clips. The load future resolves exactly
//! once: with the asset, or with [`Error::Load`].

use std::sync::Arc;

use crate::{
    data_structures::{
        animation::{AnimationClip, AnimationTarget, Sample, Transform},
        scene::SceneNode,
    },
    error::{Error, Result},
};

pub mod animation;

#[cfg(not(target_arch = "wasm32"))]
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;
#[cfg(target_arch = "wasm32")]
pub type BoxFuture<'a, T> = futures::future::LocalBoxFuture<'a, T>;

/// Byte-count callback: `(loaded, total)`. `total` is `None` when unknown.
pub type ByteProgress<'a> = &'a mut (dyn FnMut(u64, Option<u64>) + Send);

/// Fetches raw bytes for a URL.
pub trait Transport: Send + Sync {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        on_bytes: ByteProgress<'a>,
    ) -> BoxFuture<'a, anyhow::Result<Vec<u8>>>;
}

/// Reads assets from a directory on disk, `./assets` by default.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileTransport {
    root: std::path::PathBuf,
    chunk_size: usize,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileTransport {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunk_size: 64 * 1024,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for FileTransport {
    fn default() -> Self {
        Self::new(std::path::Path::new("./").join("assets"))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Transport for FileTransport {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        on_bytes: ByteProgress<'a>,
    ) -> BoxFuture<'a, anyhow::Result<Vec<u8>>> {
        Box::pin(async move {
            use tokio::io::AsyncReadExt;

            let path = self.root.join(url);
            let mut file = tokio::fs::File::open(&path).await?;
            let total = file.metadata().await?.len();
            let mut data = Vec::with_capacity(total as usize);
            let mut chunk = vec![0u8; self.chunk_size];
            loop {
                let read = file.read(&mut chunk).await?;
                if read == 0 {
                    break;
                }
                data.extend_from_slice(&chunk[..read]);
                on_bytes(data.len() as u64, Some(total));
            }
            Ok(data)
        })
    }
}

/// Drains a chunked body, reporting the running byte count after every chunk.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
async fn collect_body<S, B, E>(
    body: S,
    total: Option<u64>,
    on_bytes: ByteProgress<'_>,
) -> anyhow::Result<Vec<u8>>
where
    S: futures::Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    anyhow::Error: From<E>,
{
    use futures::StreamExt;

    let mut body = std::pin::pin!(body);
    let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
    while let Some(chunk) = body.next().await {
        data.extend_from_slice(chunk?.as_ref());
        on_bytes(data.len() as u64, total);
    }
    Ok(data)
}

/// Fetches assets relative to the page origin.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Default)]
pub struct HttpTransport;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page origin is not available"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

#[cfg(target_arch = "wasm32")]
impl Transport for HttpTransport {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        on_bytes: ByteProgress<'a>,
    ) -> BoxFuture<'a, anyhow::Result<Vec<u8>>> {
        Box::pin(async move {
            let response = reqwest::get(format_url(url)?).await?.error_for_status()?;
            let total = response.content_length();
            collect_body(response.bytes_stream(), total, on_bytes).await
        })
    }
}

/// Node of a loaded asset, by glTF node index.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDesc {
    pub name: Option<String>,
    pub transform: Transform,
    pub children: Vec<usize>,
}

/// A fully parsed asset bundle.
#[derive(Debug)]
pub struct Asset {
    pub url: String,
    pub document: gltf::Document,
    pub buffers: Vec<Vec<u8>>,
    pub nodes: Vec<NodeDesc>,
    /// Root nodes of the default scene (or the first scene).
    pub roots: Vec<usize>,
    pub animations: Vec<AnimationClip>,
}

impl Asset {
    /// A scene node holding one mutable local transform per asset node.
    /// Use it as both scene content and animation target.
    pub fn instantiate(&self) -> AssetNode {
        AssetNode {
            name: self.url.clone(),
            nodes: self.nodes.clone(),
            roots: self.roots.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssetNode {
    name: String,
    nodes: Vec<NodeDesc>,
    roots: Vec<usize>,
}

impl AssetNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_transform(&self, node: usize) -> Option<&Transform> {
        self.nodes.get(node).map(|n| &n.transform)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.name.as_deref() == Some(name))
    }

    /// Parent-to-child composed matrix of `node`.
    pub fn world_matrix(&self, node: usize) -> Option<cgmath::Matrix4<f32>> {
        fn walk(
            nodes: &[NodeDesc],
            current: usize,
            wanted: usize,
            parent: cgmath::Matrix4<f32>,
        ) -> Option<cgmath::Matrix4<f32>> {
            let world = parent * nodes.get(current)?.transform.to_matrix();
            if current == wanted {
                return Some(world);
            }
            nodes[current]
                .children
                .iter()
                .find_map(|&child| walk(nodes, child, wanted, world))
        }
        use cgmath::SquareMatrix;
        self.roots
            .iter()
            .find_map(|&root| walk(&self.nodes, root, node, cgmath::Matrix4::identity()))
    }
}

impl SceneNode for AssetNode {
    fn kind(&self) -> &'static str {
        "AssetNode"
    }
}

impl AnimationTarget for AssetNode {
    fn apply(&mut self, node: usize, sample: Sample, weight: f32) {
        match self.nodes.get_mut(node) {
            Some(desc) => desc.transform.apply(sample, weight),
            None => log::warn!("{}: animation drives unknown node {}", self.name, node),
        }
    }
}

/// Loads asset bundles through a shared transport. Cheap to clone.
#[derive(Clone)]
pub struct AssetLoader {
    transport: Arc<dyn Transport>,
}

impl AssetLoader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Fetch and parse `url`. `on_progress` receives non-decreasing percentages
    /// in `[0, 100]` whenever the transport knows the total size.
    pub fn load<P>(&self, url: &str, mut on_progress: P) -> impl Future<Output = Result<Asset>> + use<P>
    where
        P: FnMut(f32) + Send + 'static,
    {
        let transport = self.transport.clone();
        let url = url.to_string();
        async move {
            let mut last = 0.0f32;
            let mut report = |loaded: u64, total: Option<u64>| {
                let Some(total) = total.filter(|&t| t > 0) else {
                    return;
                };
                let percent = ((loaded as f64 / total as f64) * 100.0).clamp(0.0, 100.0) as f32;
                if percent >= last {
                    last = percent;
                    on_progress(percent);
                }
            };
            let bytes = transport
                .fetch(&url, &mut report)
                .await
                .map_err(|e| Error::load(&url, e))?;
            log::info!("loaded {} ({} bytes), parsing", url, bytes.len());
            parse(&url, &bytes, transport.as_ref()).await
        }
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let transport: Arc<dyn Transport> = Arc::new(FileTransport::default());
        #[cfg(target_arch = "wasm32")]
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport);
        Self::new(transport)
    }
}

/// Sibling path of `url` for a relative buffer URI.
fn resolve(url: &str, uri: &str) -> String {
    match url.rfind('/') {
        Some(idx) => format!("{}/{}", &url[..idx], uri),
        None => uri.to_string(),
    }
}

async fn parse(url: &str, bytes: &[u8], transport: &dyn Transport) -> Result<Asset> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice(bytes).map_err(|e| Error::load(url, e))?;

    let mut blob = blob;
    let mut buffers = Vec::new();
    for buffer in document.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match blob.take() {
                Some(data) => buffers.push(data),
                None => {
                    return Err(Error::load(url, anyhow::anyhow!("GLB binary chunk is missing")));
                }
            },
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                return Err(Error::load(
                    url,
                    anyhow::anyhow!("embedded data URIs are not supported (buffer {})", buffer.index()),
                ));
            }
            gltf::buffer::Source::Uri(uri) => {
                let path = resolve(url, uri);
                let data = transport
                    .fetch(&path, &mut |_: u64, _: Option<u64>| ())
                    .await
                    .map_err(|e| Error::load(url, e.context(format!("buffer `{}`", path))))?;
                if data.len() < buffer.length() {
                    return Err(Error::load(
                        url,
                        anyhow::anyhow!(
                            "buffer `{}` has {} bytes, expected {}",
                            path,
                            data.len(),
                            buffer.length()
                        ),
                    ));
                }
                buffers.push(data);
            }
        }
    }

    let nodes = document
        .nodes()
        .map(|node| {
            let (position, [x, y, z, w], scale) = node.transform().decomposed();
            NodeDesc {
                name: node.name().map(str::to_string),
                transform: Transform {
                    position: position.into(),
                    rotation: cgmath::Quaternion::new(w, x, y, z),
                    scale: scale.into(),
                },
                children: node.children().map(|child| child.index()).collect(),
            }
        })
        .collect();

    let roots = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .map(|scene| scene.nodes().map(|node| node.index()).collect())
        .unwrap_or_default();

    let animations = animation::read_clips(&document, &buffers);
    log::debug!("{}: {} animation clips", url, animations.len());

    Ok(Asset {
        url: url.to_string(),
        document,
        buffers,
        nodes,
        roots,
        animations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunked_body_reports_every_chunk() {
        let chunks: Vec<anyhow::Result<Vec<u8>>> = vec![Ok(vec![1; 4]), Ok(vec![2; 4]), Ok(vec![3; 2])];
        let mut reports = Vec::new();
        let mut on_bytes = |loaded: u64, total: Option<u64>| reports.push((loaded, total));

        let data = futures::executor::block_on(collect_body(
            futures::stream::iter(chunks),
            Some(10),
            &mut on_bytes,
        ))
        .unwrap();

        assert_eq!(data, [1, 1, 1, 1, 2, 2, 2, 2, 3, 3]);
        assert_eq!(reports, [(4, Some(10)), (8, Some(10)), (10, Some(10))]);
    }

    #[test]
    fn chunked_body_stops_at_the_first_error() {
        let chunks: Vec<anyhow::Result<Vec<u8>>> =
            vec![Ok(vec![0; 3]), Err(anyhow::anyhow!("connection reset")), Ok(vec![0; 3])];
        let mut reports = Vec::new();
        let mut on_bytes = |loaded: u64, total: Option<u64>| reports.push((loaded, total));

        let err = futures::executor::block_on(collect_body(futures::stream::iter(chunks), None, &mut on_bytes))
            .unwrap_err();

        assert!(err.to_string().contains("reset"));
        assert_eq!(reports, [(3, None)]);
    }
}
