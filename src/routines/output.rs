use crate::simulator::{Compartment, Trajectory};
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Contains all the necessary information of an output file
#[derive(Debug)]
pub struct OutputFile {
    file: File,
    relative_path: PathBuf,
}

impl OutputFile {
    pub fn new(folder: &str, file_name: &str) -> Result<Self> {
        let relative_path = Path::new(&folder).join(file_name);

        if let Some(parent) = relative_path.parent() {
            create_dir_all(parent)
                .with_context(|| format!("Failed to create directories for {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&relative_path)
            .with_context(|| format!("Failed to open file: {:?}", relative_path))?;

        Ok(OutputFile {
            file,
            relative_path,
        })
    }

    pub fn file_owned(self) -> File {
        self.file
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }
}

/// Write a trajectory as CSV with the header `time,T,T1,T2,V`
///
/// Each row is one sample of the time grid. Values are written with full precision.
pub fn write_trajectory<W: Write>(trajectory: &Trajectory, writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);

    let mut header = vec!["time"];
    header.extend(Compartment::ALL.iter().map(|c| c.name()));
    writer.write_record(&header)?;

    for (t, state) in trajectory.iter() {
        let mut row = vec![t.to_string()];
        row.extend(state.to_array().iter().map(|x| x.to_string()));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a trajectory to `folder/file_name`, returning the path written
pub fn write_trajectory_file(trajectory: &Trajectory, folder: &str, file_name: &str) -> Result<PathBuf> {
    let outputfile = OutputFile::new(folder, file_name)?;
    let path = outputfile.relative_path().to_path_buf();
    write_trajectory(trajectory, outputfile.file_owned())
        .with_context(|| format!("Failed to write trajectory to {:?}", path))?;
    tracing::info!("Trajectory written to {:?}", path);
    Ok(path)
}
