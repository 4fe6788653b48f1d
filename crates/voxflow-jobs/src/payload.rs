//! Payload router: inline storage vs blob offload for completed results.

use tracing::{debug, info};
use uuid::Uuid;

use voxflow_core::{defaults, BlobStore, Result, Segment, TranscriptDocument};

/// Deterministic blob path for a job's offloaded transcript. Reusing the
/// same path makes a duplicate offload attempt an overwrite, never a
/// divergent copy.
pub fn transcript_blob_path(job_id: Uuid) -> String {
    format!("transcripts/{}/transcript.json", job_id)
}

/// Where a completed result ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredTranscript {
    /// Small enough for the job record itself.
    Inline {
        transcript: String,
        segments: Vec<Segment>,
    },
    /// Too large for the record; only a pointer plus summary figures are
    /// kept inline.
    Offloaded {
        path: String,
        segment_count: i64,
        transcript_length: i64,
    },
}

/// Serialize the result, measure it, and either keep it inline or write it
/// to the blob store. Decided exactly once per completed job.
pub async fn route_payload(
    blobs: &dyn BlobStore,
    job_id: Uuid,
    doc: &TranscriptDocument,
    inline_limit: usize,
) -> Result<StoredTranscript> {
    let serialized = serde_json::to_vec(doc)?;

    if serialized.len() > inline_limit {
        let path = transcript_blob_path(job_id);
        blobs
            .put(&path, &serialized, defaults::TRANSCRIPT_CONTENT_TYPE)
            .await?;
        info!(
            job_id = %job_id,
            payload_bytes = serialized.len(),
            segment_count = doc.segments.len(),
            blob_path = %path,
            "Transcript offloaded to blob storage"
        );
        Ok(StoredTranscript::Offloaded {
            path,
            segment_count: doc.segments.len() as i64,
            transcript_length: doc.transcript.len() as i64,
        })
    } else {
        debug!(
            job_id = %job_id,
            payload_bytes = serialized.len(),
            "Transcript stored inline"
        );
        Ok(StoredTranscript::Inline {
            transcript: doc.transcript.clone(),
            segments: doc.segments.clone(),
        })
    }
}
