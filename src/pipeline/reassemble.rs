use crate::error::PipelineError;
use crate::parallel::{ScratchSpace, WorkResult};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Stream every result into `out` in ascending `order_key` order.
///
/// Keys must form the contiguous range `0..results.len()`; a gap means a chunk
/// never made it to scratch storage and nothing is written past it.
pub fn merge<W: Write>(mut results: Vec<WorkResult>, out: &mut W) -> Result<u64, PipelineError> {
    results.sort_by_key(|r| r.order_key);

    let mut written = 0;
    for (expected, result) in results.iter().enumerate() {
        if result.order_key != expected {
            return Err(PipelineError::Reassembly(format!(
                "missing result for chunk {expected}"
            )));
        }

        let mut part = File::open(&result.path).map_err(|e| {
            PipelineError::Reassembly(format!(
                "scratch result for chunk {} unreadable at {}: {e}",
                result.order_key,
                result.path.display()
            ))
        })?;
        let copied = io::copy(&mut part, out).map_err(|e| {
            PipelineError::Reassembly(format!("failed writing chunk {}: {e}", result.order_key))
        })?;
        if copied != result.bytes as u64 {
            return Err(PipelineError::Reassembly(format!(
                "scratch result for chunk {} holds {copied} bytes, worker wrote {}",
                result.order_key, result.bytes
            )));
        }
        written += copied;
    }

    Ok(written)
}

/// Merge results into `output` and release the scratch space on every path.
///
/// The output is staged in a temporary file beside `output` and renamed into
/// place only after the last chunk is written.
pub fn reassemble(
    results: Vec<WorkResult>,
    output: &Path,
    scratch: ScratchSpace,
) -> Result<u64, PipelineError> {
    let written = write_output(results, output);
    let released = scratch.release();
    let written = written?;
    released?;
    Ok(written)
}

fn write_output(results: Vec<WorkResult>, output: &Path) -> Result<u64, PipelineError> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let sink_err = |e: io::Error| {
        PipelineError::Reassembly(format!("cannot write {}: {e}", output.display()))
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".shiftpipe-out-")
        .tempfile_in(dir)
        .map_err(sink_err)?;

    let written = {
        let mut writer = BufWriter::new(staged.as_file_mut());
        let written = merge(results, &mut writer)?;
        writer.flush().map_err(sink_err)?;
        written
    };

    staged
        .persist(output)
        .map_err(|e| sink_err(e.error))?;
    Ok(written)
}
