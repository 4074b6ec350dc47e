use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::Vector3;

use crate::error::Result;

/// World positions of every segment centre at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub time: f64,
    pub positions: Vec<Vector3<f64>>,
}

/// Write frames as CSV rows `time,segment,x,y,z`, creating parent directories.
pub fn write_frames(path: &Path, frames: &[Frame]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "time,segment,x,y,z")?;
    for frame in frames {
        for (segment, p) in frame.positions.iter().enumerate() {
            writeln!(writer, "{:.4},{},{:.6},{:.6},{:.6}", frame.time, segment, p.x, p.y, p.z)?;
        }
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod frames_tests {
    use nalgebra::vector;

    use super::*;

    #[test]
    fn writes_one_row_per_segment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames").join("run_0.csv");
        let frames = vec![
            Frame { time: 0.02, positions: vec![vector![0.0, 0.0, 0.0], vector![-0.1, 0.0, 0.0]] },
            Frame { time: 0.04, positions: vec![vector![0.01, 0.0, 0.0], vector![-0.09, 0.0, 0.0]] },
        ];

        write_frames(&path, &frames).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "time,segment,x,y,z");
        assert!(lines[4].starts_with("0.0400,1,"));
    }
}
