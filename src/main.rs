//! Command line front-end: load a volume, render one view, write it out.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use nalgebra::{Point3, Vector3};
use volume_reslice::{
    ObliquePlaneSampler, PathReformatter, RayCastProjector, VolumeLoader, VoxelVolume,
    WireframeProjector,
    enums::{Axis, SortBy},
    windowing,
};

#[derive(Parser, Debug)]
#[command(author, about, version)]
struct Args {
    /// Raw volume file, one byte per voxel (requires --dims)
    #[arg(long, conflicts_with = "dicom", requires = "dims")]
    raw: Option<PathBuf>,

    /// Volume size as X Y Z
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"])]
    dims: Option<Vec<usize>>,

    /// Directory of .dcm files
    #[arg(long)]
    dicom: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SortArg::InstanceNumber)]
    sort_by: SortArg,

    /// Stretch the rendered raster to the full 8-bit range
    #[arg(long)]
    normalize: bool,

    /// Output file; images take their format from the extension
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Axis-aligned cut
    Cut {
        #[arg(long, value_enum)]
        axis: AxisArg,
        #[arg(long)]
        pos: usize,
        #[arg(long)]
        mirror: bool,
    },
    /// Oblique plane through a point
    Oblique {
        #[arg(long, num_args = 3, required = true, allow_negative_numbers = true)]
        point: Vec<f64>,
        #[arg(long, num_args = 3, required = true, allow_negative_numbers = true)]
        normal: Vec<f64>,
    },
    /// Stack of oblique slices along a segment, written as a raw volume
    Reformat {
        #[arg(long)]
        slices: usize,
        #[arg(long, num_args = 3, required = true, allow_negative_numbers = true)]
        from: Vec<f64>,
        #[arg(long, num_args = 3, required = true, allow_negative_numbers = true)]
        to: Vec<f64>,
    },
    /// Maximum-intensity projection
    Mip {
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        delta_x: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        delta_y: f64,
        #[arg(long, num_args = 3, allow_negative_numbers = true, default_values_t = [0.0, 0.0, 1.0])]
        view: Vec<f64>,
    },
    /// Visible edges of the rotated bounding box
    Wireframe {
        #[arg(long, num_args = 3, allow_negative_numbers = true, default_values_t = [0.0, 0.0, 0.0])]
        rotation: Vec<f64>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AxisArg {
    X,
    Y,
    Z,
}

impl From<AxisArg> for Axis {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::X => Axis::X,
            AxisArg::Y => Axis::Y,
            AxisArg::Z => Axis::Z,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

impl From<SortArg> for SortBy {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::ImagePositionPatient => SortBy::ImagePositionPatient,
            SortArg::TablePosition => SortBy::TablePosition,
            SortArg::InstanceNumber => SortBy::InstanceNumber,
            SortArg::None => SortBy::None,
        }
    }
}

fn triple(values: &[f64]) -> [f64; 3] {
    [values[0], values[1], values[2]]
}

fn load(args: &Args) -> Result<VoxelVolume, Box<dyn std::error::Error>> {
    match (&args.raw, &args.dims, &args.dicom) {
        (Some(raw), Some(dims), _) => Ok(VolumeLoader::load_from_raw_file(
            raw,
            (dims[0], dims[1], dims[2]),
        )?),
        (None, _, Some(dir)) => Ok(VolumeLoader::load_from_directory(dir, args.sort_by.into())?),
        _ => Err("either --raw with --dims or --dicom is required".into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let volume = load(&args)?;
    info!(
        "volume is {}x{}x{}",
        volume.size_x(),
        volume.size_y(),
        volume.size_z()
    );

    let raster = match &args.command {
        Command::Cut { axis, pos, mirror } => volume.cut((*axis).into(), *pos, *mirror)?,
        Command::Oblique { point, normal } => ObliquePlaneSampler::sample(
            &volume,
            &Point3::from(triple(point)),
            &Vector3::from(triple(normal)),
        )?,
        Command::Reformat { slices, from, to } => {
            let reformatted = PathReformatter::reformat(
                &volume,
                *slices,
                &Point3::from(triple(from)),
                &Point3::from(triple(to)),
            )?;
            VolumeLoader::write_raw_file(&reformatted, &args.output)?;
            info!(
                "wrote {}x{}x{} raw volume to {}",
                reformatted.size_x(),
                reformatted.size_y(),
                reformatted.size_z(),
                args.output.display()
            );
            return Ok(());
        }
        Command::Mip {
            delta_x,
            delta_y,
            view,
        } => RayCastProjector::project(&volume, *delta_x, *delta_y, &Vector3::from(triple(view)))?,
        Command::Wireframe { rotation } => {
            WireframeProjector::project(&volume, &Vector3::from(triple(rotation)))?
        }
    };

    let raster = if args.normalize {
        windowing::normalize(&raster, 8)?
    } else {
        raster
    };
    raster.save(&args.output)?;
    info!("wrote {}", args.output.display());
    Ok(())
}
