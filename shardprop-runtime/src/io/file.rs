use crate::algorithms::label_propagation::{LabelEdge, LabelState};
use shardprop_api::state::SharedVertexState;
use shardprop_common::error::{ShardPropError, ShardPropResult};
use shardprop_common::types::{Edge, Vertex, VertexId};
use std::path::Path;

fn reader(path: impl AsRef<Path>) -> ShardPropResult<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)
}

fn csv_error(e: csv::Error) -> ShardPropError {
    if e.is_io_error() {
        match e.into_kind() {
            csv::ErrorKind::Io(io) => ShardPropError::Io(io),
            other => ShardPropError::Internal(format!("csv read: {other:?}")),
        }
    } else {
        ShardPropError::Internal(format!("csv read: {e}"))
    }
}

fn parse_field<T>(rec: &csv::StringRecord, idx: usize, what: &str, line: u64) -> ShardPropResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    rec.get(idx)
        .ok_or_else(|| ShardPropError::InvalidArgument(format!("line {line}: {what} missing")))?
        .parse()
        .map_err(|e| ShardPropError::InvalidArgument(format!("line {line}: {what} parse: {e}")))
}

fn line_of(rec: &csv::StringRecord) -> u64 {
    rec.position().map(|p| p.line()).unwrap_or(0)
}

pub fn read_edges(path: impl AsRef<Path>) -> ShardPropResult<Vec<Edge<VertexId, LabelEdge>>> {
    let mut rdr = reader(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec.map_err(csv_error)?;
        let line = line_of(&rec);
        if rec.len() < 2 || rec.len() > 3 {
            return Err(ShardPropError::InvalidArgument(format!(
                "line {line}: expected src,target[,weight], got {} fields",
                rec.len()
            )));
        }
        let src: VertexId = parse_field(&rec, 0, "edge src", line)?;
        let target: VertexId = parse_field(&rec, 1, "edge target", line)?;
        let weight: f32 = if rec.len() == 3 {
            parse_field(&rec, 2, "edge weight", line)?
        } else {
            1.0
        };
        let value = LabelEdge::new(weight).map_err(|e| match e {
            ShardPropError::PreconditionViolated(msg) => ShardPropError::PreconditionViolated(
                format!("line {line}: edge {src}->{target}: {msg}"),
            ),
            other => other,
        })?;
        out.push(Edge::new(src, target, value));
    }
    Ok(out)
}

pub fn read_seeds(
    path: impl AsRef<Path>,
    dimensions: usize,
) -> ShardPropResult<Vec<Vertex<VertexId, LabelState>>> {
    let mut rdr = reader(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec.map_err(csv_error)?;
        let line = line_of(&rec);
        if rec.len() != dimensions + 2 {
            return Err(ShardPropError::InvalidArgument(format!(
                "line {line}: expected {} fields for {dimensions} labels, got {}",
                dimensions + 2,
                rec.len()
            )));
        }
        let id: VertexId = parse_field(&rec, 0, "seed id", line)?;
        let confidence: f32 = parse_field(&rec, 1, "seed confidence", line)?;
        let pvec = (0..dimensions)
            .map(|i| parse_field::<f32>(&rec, i + 2, "seed label", line))
            .collect::<ShardPropResult<Vec<_>>>()?;
        out.push(Vertex::new(id, LabelState::seed(pvec, confidence)?));
    }
    Ok(out)
}

pub fn write_states(
    path: impl AsRef<Path>,
    state: &SharedVertexState<LabelState>,
) -> ShardPropResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;
    for (id, s) in state.iter() {
        let mut row = Vec::with_capacity(s.pvec.len() + 3);
        row.push(id.to_string());
        row.push(u8::from(s.seed).to_string());
        row.push(s.confidence.to_string());
        row.extend(s.pvec.iter().map(|p| p.to_string()));
        wtr.write_record(&row).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}
