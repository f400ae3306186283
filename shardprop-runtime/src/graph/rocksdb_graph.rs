use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shardprop_api::graph::{GraphSource, WindowData};
use shardprop_common::error::{ShardPropError, ShardPropResult};
use shardprop_common::types::{Edge, Vertex, VertexId, VertexInterval};
use std::path::Path;
use std::sync::Arc;

const CF_VERTICES: &str = "vertices";
const CF_IN_EDGES: &str = "in_edges";
const CF_OUT_EDGES: &str = "out_edges";
const CF_META: &str = "meta";

const META_NUM_VERTICES: &[u8] = b"num_vertices";
const META_NUM_EDGES: &[u8] = b"num_edges";

const INGEST_BATCH: usize = 64 * 1024;

pub trait SerdeValue: Serialize + DeserializeOwned + Send + Sync + 'static {}
impl<T> SerdeValue for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

// big-endian ids: a window is one forward range scan per column family
#[derive(Clone)]
pub struct RocksDbGraphSource {
    db: Arc<DB>,
}

impl RocksDbGraphSource {
    pub fn open(path: impl AsRef<Path>) -> ShardPropResult<Self> {
        Self::open_with(path, true)
    }

    pub fn open_existing(path: impl AsRef<Path>) -> ShardPropResult<Self> {
        Self::open_with(path, false)
    }

    fn open_with(path: impl AsRef<Path>, create: bool) -> ShardPropResult<Self> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(create);
        opts.create_missing_column_families(create);

        let cfs = [CF_VERTICES, CF_IN_EDGES, CF_OUT_EDGES, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, cfs).map_err(|e| {
            ShardPropError::GraphSource(format!("open shard store {}: {e}", path.display()))
        })?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn ingest<VV, EV>(
        &self,
        num_vertices: u64,
        vertices: &[Vertex<VertexId, VV>],
        edges: &[Edge<VertexId, EV>],
    ) -> ShardPropResult<()>
    where
        VV: SerdeValue,
        EV: SerdeValue,
    {
        let num_vertices = num_vertices.max(self.stored_num_vertices()?.unwrap_or(0));
        for v in vertices {
            check_id(v.id, num_vertices)?;
        }
        for e in edges {
            check_id(e.src_id, num_vertices)?;
            check_id(e.target_id, num_vertices)?;
        }

        let cf_vertices = self.cf(CF_VERTICES)?;
        for chunk in vertices.chunks(INGEST_BATCH) {
            let mut batch = WriteBatch::default();
            for v in chunk {
                batch.put_cf(cf_vertices, v.id.to_be_bytes(), encode(&v.value)?);
            }
            self.write(batch, "vertices")?;
        }

        let cf_in = self.cf(CF_IN_EDGES)?;
        let cf_out = self.cf(CF_OUT_EDGES)?;
        for chunk in edges.chunks(INGEST_BATCH) {
            let mut batch = WriteBatch::default();
            for e in chunk {
                batch.put_cf(cf_in, edge_key(e.target_id, e.src_id), encode(&e.value)?);
                batch.put_cf(cf_out, edge_key(e.src_id, e.target_id), b"");
            }
            self.write(batch, "edges")?;
        }

        let num_edges = self.db.iterator_cf(cf_out, IteratorMode::Start).count() as u64;
        let cf_meta = self.cf(CF_META)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(cf_meta, META_NUM_VERTICES, num_vertices.to_be_bytes());
        batch.put_cf(cf_meta, META_NUM_EDGES, num_edges.to_be_bytes());
        self.write(batch, "meta")?;
        tracing::info!(num_vertices, num_edges, "shard store ingest done");
        Ok(())
    }

    fn stored_num_vertices(&self) -> ShardPropResult<Option<u64>> {
        self.meta_u64(META_NUM_VERTICES)
    }

    fn meta_u64(&self, key: &[u8]) -> ShardPropResult<Option<u64>> {
        let cf = self.cf(CF_META)?;
        let raw = self
            .db
            .get_cf(cf, key)
            .map_err(|e| ShardPropError::GraphSource(format!("rocksdb get meta: {e}")))?;
        raw.map(|bytes| decode_u64(&bytes)).transpose()
    }

    fn required_meta(&self, key: &[u8]) -> ShardPropResult<u64> {
        self.meta_u64(key)?.ok_or_else(|| {
            ShardPropError::GraphSource(format!(
                "shard store has no {} entry; ingest a graph first",
                String::from_utf8_lossy(key)
            ))
        })
    }

    fn cf(&self, name: &str) -> ShardPropResult<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| ShardPropError::Internal(format!("missing column family: {name}")))
    }

    fn write(&self, batch: WriteBatch, what: &str) -> ShardPropResult<()> {
        self.db
            .write(batch)
            .map_err(|e| ShardPropError::GraphSource(format!("rocksdb write batch ({what}): {e}")))
    }

    fn scan(
        &self,
        cf_name: &str,
        from: &[u8],
        mut visit: impl FnMut(&[u8], &[u8]) -> ShardPropResult<bool>,
    ) -> ShardPropResult<()> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(from, Direction::Forward));
        for kv in iter {
            let (k, v) =
                kv.map_err(|e| ShardPropError::GraphSource(format!("rocksdb iter: {e}")))?;
            if !visit(&k, &v)? {
                break;
            }
        }
        Ok(())
    }
}

fn check_id(id: VertexId, num_vertices: u64) -> ShardPropResult<()> {
    if id >= num_vertices {
        return Err(ShardPropError::InvalidArgument(format!(
            "vertex id {id} out of range (num_vertices={num_vertices})"
        )));
    }
    Ok(())
}

fn edge_key(major: VertexId, minor: VertexId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&major.to_be_bytes());
    key[8..].copy_from_slice(&minor.to_be_bytes());
    key
}

fn decode_u64(bytes: &[u8]) -> ShardPropResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| ShardPropError::GraphSource(format!("bad id key length {}", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

fn decode_edge_key(bytes: &[u8]) -> ShardPropResult<(VertexId, VertexId)> {
    if bytes.len() != 16 {
        return Err(ShardPropError::GraphSource(format!(
            "bad edge key length {}",
            bytes.len()
        )));
    }
    Ok((decode_u64(&bytes[..8])?, decode_u64(&bytes[8..])?))
}

fn encode<T: Serialize>(v: &T) -> ShardPropResult<Vec<u8>> {
    bincode::serialize(v).map_err(|e| ShardPropError::Internal(format!("bincode encode: {e}")))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> ShardPropResult<T> {
    bincode::deserialize(bytes).map_err(|e| ShardPropError::GraphSource(format!("bincode decode: {e}")))
}

impl<VV, EV> GraphSource<VV, EV> for RocksDbGraphSource
where
    VV: SerdeValue,
    EV: SerdeValue,
{
    fn num_vertices(&self) -> ShardPropResult<u64> {
        self.required_meta(META_NUM_VERTICES)
    }

    fn num_edges(&self) -> ShardPropResult<u64> {
        self.required_meta(META_NUM_EDGES)
    }

    fn load_window(&self, interval: VertexInterval) -> ShardPropResult<WindowData<VV, EV>> {
        let mut window = WindowData::empty(interval);
        if interval.is_empty() {
            return Ok(window);
        }

        self.scan(CF_VERTICES, &interval.start.to_be_bytes(), |k, v| {
            let id = decode_u64(k)?;
            if id > interval.end {
                return Ok(false);
            }
            window.vertices.push(Vertex::new(id, decode(v)?));
            Ok(true)
        })?;

        self.scan(CF_IN_EDGES, &edge_key(interval.start, 0), |k, v| {
            let (target, src) = decode_edge_key(k)?;
            if target > interval.end {
                return Ok(false);
            }
            window.in_edges.push(Edge::new(src, target, decode(v)?));
            Ok(true)
        })?;

        self.scan(CF_OUT_EDGES, &edge_key(interval.start, 0), |k, _| {
            let (src, target) = decode_edge_key(k)?;
            if src > interval.end {
                return Ok(false);
            }
            window.out_edges.push((src, target));
            Ok(true)
        })?;

        Ok(window)
    }

    fn persist_edges(
        &self,
        interval: VertexInterval,
        edges: &[Edge<VertexId, EV>],
    ) -> ShardPropResult<()> {
        let cf = self.cf(CF_IN_EDGES)?;
        let mut batch = WriteBatch::default();
        for e in edges {
            if !interval.contains(e.target_id) {
                return Err(ShardPropError::InvalidArgument(format!(
                    "edge {}->{} does not belong to window {interval}",
                    e.src_id, e.target_id
                )));
            }
            batch.put_cf(cf, edge_key(e.target_id, e.src_id), encode(&e.value)?);
        }
        self.write(batch, "in_edges")
    }
}
