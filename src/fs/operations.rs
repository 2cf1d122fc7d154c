use std::time::Duration;

use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{self, AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWriteExt},
};

/// Size of chunks read while scanning a file from the end.
pub const SCAN_CHUNK: usize = 1024;

const LOCK_RETRY: Duration = Duration::from_millis(5);
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Takes an advisory lock on the file without blocking the runtime thread. The lock is retried
/// until it's free or `timeout` runs out, in which case [io::ErrorKind::TimedOut] is returned.
pub async fn lock_file(file: &File, mode: LockMode, timeout: Duration) -> Result<(), io::Error> {
    let contended = fs4::lock_contended_error().kind();
    let attempts = async {
        loop {
            let attempt = match mode {
                LockMode::Shared => file.try_lock_shared(),
                LockMode::Exclusive => file.try_lock_exclusive(),
            };
            match attempt {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == contended => tokio::time::sleep(LOCK_RETRY).await,
                Err(e) => return Err(e),
            }
        }
    };

    tokio::time::timeout(timeout, attempts)
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "Timed out waiting for file lock"))?
}

/// Returns the offset at which the last line of the file begins. A newline terminating the file
/// doesn't count as the start of an empty line, so for `a\nb\n` the result points at `b`.
pub async fn last_line_start(
    file: &mut (impl AsyncSeek + AsyncRead + Unpin),
    buffer: &mut [u8],
) -> Result<u64, io::Error> {
    let mut position = file.seek(io::SeekFrom::End(0)).await?;
    let mut at_file_end = true;

    while position > 0 {
        let chunk = u64::min(position, buffer.len() as u64) as usize;
        position -= chunk as u64;
        file.seek(io::SeekFrom::Start(position)).await?;
        file.read_exact(&mut buffer[..chunk]).await?;

        for (index, value) in buffer[..chunk].iter().enumerate().rev() {
            if at_file_end {
                at_file_end = false;
                if *value == b'\n' {
                    continue;
                }
            }
            if *value == b'\n' {
                return Ok(position + index as u64 + 1);
            }
        }
    }
    Ok(0)
}

/// Reads the last line without its terminating newline. Returns an empty string for an empty file.
pub async fn read_last_line(
    file: &mut (impl AsyncSeek + AsyncRead + Unpin),
) -> Result<String, io::Error> {
    let start = last_line_start(file, &mut [0; SCAN_CHUNK]).await?;
    file.seek(io::SeekFrom::Start(start)).await?;
    let mut line = String::new();
    file.read_to_string(&mut line).await?;
    line.truncate(line.trim_end_matches(['\n', '\r']).len());
    Ok(line)
}

/// Appends `line` followed by a newline and waits for the data to reach the disk.
pub async fn append_line(file: &mut File, line: &str) -> Result<(), io::Error> {
    file.seek(io::SeekFrom::End(0)).await?;
    write_line(file, line).await
}

/// Overwrites the last line of the file with `line`. Nothing before the last line is touched.
pub async fn replace_last_line(file: &mut File, line: &str) -> Result<(), io::Error> {
    let start = last_line_start(file, &mut [0; SCAN_CHUNK]).await?;
    file.set_len(start).await?;
    file.seek(io::SeekFrom::Start(start)).await?;
    write_line(file, line).await
}

async fn write_line(file: &mut File, line: &str) -> Result<(), io::Error> {
    let mut buffer = Vec::with_capacity(line.len() + 1);
    buffer.extend_from_slice(line.as_bytes());
    buffer.push(b'\n');
    file.write_all(&buffer).await?;
    file.flush().await?;
    file.sync_data().await
}
