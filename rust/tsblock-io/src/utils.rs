#[macro_export]
macro_rules! verify {
    ($expr:expr) => {{
        let result = $expr;
        $crate::utils::verify(result, stringify!($expr))?;
    }};
}

pub fn verify(predicate: bool, condition: &str) -> std::io::Result<()> {
    if predicate {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            condition,
        ))
    }
}

/// Reads from `read` until `buffer` is full or the stream ends, returning the
/// number of bytes placed into `buffer`.
///
/// Unlike `read_exact`, a short count is not an error: the caller decides whether
/// the end of the stream was acceptable.
pub fn read_fully<R: std::io::Read>(mut read: R, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut pos: usize = 0;
    while pos < buffer.len() {
        match read.read(&mut buffer[pos..]) {
            Ok(0) => break,
            Ok(bytes) => pos += bytes,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(pos)
}

/// Discards exactly `count` bytes from `read`.
///
/// Returns the number of bytes skipped, which is less than `count` only when the
/// stream ended early.
pub fn skip<R: std::io::Read>(read: R, count: u64) -> std::io::Result<u64> {
    std::io::copy(&mut read.take(count), &mut std::io::sink())
}
