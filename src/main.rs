use std::fs::{self, File};
use std::io::Error as IoError;
use std::path::{Path, PathBuf};

use clap::Parser;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use memmap2::MmapOptions;
use rayon::prelude::*;

use permbin::error::IResult;
use permbin::model::{Model, assemble};
use permbin::perm;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// .perm.bin file(s) or directories containing them
    files: Vec<PathBuf>,

    /// Output directory. Defaults to each input file's directory.
    #[clap(short, long)]
    out_dir: Option<PathBuf>,

    /// Also decode each texture to PNG next to its DDS output
    #[clap(long)]
    png: bool,

    /// Write the assembled meshes as Wavefront OBJ/MTL
    #[clap(long)]
    obj: bool,

    /// Write a JSON summary of the assembled model
    #[clap(long)]
    json: bool,
}

fn main() -> IResult<()> {
    let args = Args::parse();

    let mut paths = Vec::with_capacity(args.files.len());
    for path in &args.files {
        if path.is_dir() {
            for entry in fs::read_dir(path)? {
                let entry = entry?;
                let name = entry.file_name();
                if entry.file_type()?.is_file()
                    && name.to_string_lossy().ends_with(".perm.bin")
                {
                    paths.push(entry.path());
                }
            }
        } else {
            paths.push(path.clone());
        }
    }

    if let Some(out_dir) = &args.out_dir {
        fs::create_dir_all(out_dir)?;
    }

    paths
        .into_par_iter()
        .try_for_each(|path| extract_file(&path, &args))
}

/// The `.temp.bin` sidecar holding texture payloads sits next to the
/// `.perm.bin` file.
fn sidecar_bytes(perm_path: &Path) -> Option<Vec<u8>> {
    let name = perm_path.file_name()?.to_string_lossy();
    let temp_name = name.replace(".perm.", ".temp.");
    if temp_name == *name {
        return None;
    }
    fs::read(perm_path.with_file_name(temp_name)).ok()
}

fn file_stem(path: &Path) -> String {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    let name = name.unwrap_or_else(|| String::from("model"));
    name.strip_suffix(".perm.bin").unwrap_or(&name).to_string()
}

fn extract_file(path: &Path, args: &Args) -> IResult<()> {
    let input = File::open(path)?;
    let mmap = unsafe { MmapOptions::new().map(&input)? };
    let sidecar = sidecar_bytes(path);

    let session = perm::parse(&mmap)?;
    for failure in &session.failures {
        eprintln!("{}: {:?} at 0x{:X}: {}", path.display(), failure.tag, failure.offset, failure.error);
    }

    let model = assemble(&session, sidecar.as_deref());
    for failure in &model.failures {
        eprintln!("{}: {failure:?}", path.display());
    }

    let out_dir = match &args.out_dir {
        Some(dir) => dir.clone(),
        None => path.parent().unwrap_or(Path::new(".")).to_path_buf(),
    };
    let stem = file_stem(path);

    for texture in &model.textures {
        let dds_path = out_dir.join(format!("{stem}.{}.dds", texture.id));
        fs::write(&dds_path, texture.to_dds())?;

        if args.png {
            let image = texture
                .decode()
                .map_err(|e| IoError::other(format!("texture {}: {e}", texture.id)))?;
            let mut png = Vec::new();
            PngEncoder::new(&mut png)
                .write_image(
                    &image.data,
                    image.width,
                    image.height,
                    image::ExtendedColorType::Rgba8,
                )
                .map_err(|e| IoError::other(format!("png encode: {e}")))?;
            fs::write(out_dir.join(format!("{stem}.{}.png", texture.id)), png)?;
        }
    }

    if args.obj {
        let (obj, mtl) = write_obj(&model, &stem);
        fs::write(out_dir.join(format!("{stem}.obj")), obj)?;
        fs::write(out_dir.join(format!("{stem}.mtl")), mtl)?;
    }

    if args.json {
        let json = serde_json::to_vec_pretty(&model)?;
        fs::write(out_dir.join(format!("{stem}.json")), json)?;
    }

    println!(
        "{}: {} meshes, {} materials, {} textures, {} bones ({} parse / {} assembly failures)",
        path.display(),
        model.meshes.len(),
        model.materials.len(),
        model.textures.len(),
        model.bone_names.len(),
        session.failures.len(),
        model.failures.len(),
    );

    Ok(())
}

fn material_label(model: &Model, index: usize) -> String {
    let material = &model.materials[index];
    if material.name.is_empty() {
        format!("mat_{index}")
    } else {
        material.name.clone()
    }
}

/// Emit the assembled meshes as a Wavefront OBJ document plus its MTL
/// library. OBJ indices are global and 1-based.
fn write_obj(model: &Model, stem: &str) -> (String, String) {
    use std::fmt::Write;

    let mut obj = String::new();
    let mut mtl = String::new();
    let _ = writeln!(obj, "mtllib {stem}.mtl");

    let mut vertex_base = 1usize;
    for mesh in &model.meshes {
        let _ = writeln!(obj, "o {}", mesh.name);
        for p in &mesh.positions {
            let _ = writeln!(obj, "v {} {} {}", p[0], p[1], p[2]);
        }
        for n in &mesh.normals {
            let _ = writeln!(obj, "vn {} {} {}", n[0], n[1], n[2]);
        }
        if let Some(uvs) = &mesh.uvs {
            for uv in uvs {
                let _ = writeln!(obj, "vt {} {}", uv[0], uv[1]);
            }
        }
        if let Some(material) = mesh.material {
            let _ = writeln!(obj, "usemtl {}", material_label(model, material));
        }
        for tri in &mesh.triangles {
            let [a, b, c] = tri.map(|i| i as usize + vertex_base);
            if mesh.uvs.is_some() {
                let _ = writeln!(obj, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}");
            } else {
                let _ = writeln!(obj, "f {a}//{a} {b}//{b} {c}//{c}");
            }
        }
        vertex_base += mesh.positions.len();
    }

    for (index, material) in model.materials.iter().enumerate() {
        let _ = writeln!(mtl, "newmtl {}", material_label(model, index));
        if let Some(texture) = material.diffuse {
            let _ = writeln!(mtl, "map_Kd {stem}.{}.dds", model.textures[texture].id);
        }
    }

    (obj, mtl)
}
