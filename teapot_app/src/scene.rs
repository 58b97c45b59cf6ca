//! Demonstration scene graph
//!
//! A tree of [`Object`]s, each optionally carrying a mesh and surface
//! parameters, with a transform per child instance. The tree is built once at
//! startup; only the animation rotation changes afterwards.

use std::path::Path;

use deferred_engine::assets::ObjLoader;
use deferred_engine::foundation::math::{rotate, scale, translate, Axis, Mat4, Vec3};
use deferred_engine::render::scene::ActiveProgram;
use deferred_engine::render::{GraphicsDevice, MeshHandle, RenderResult, SceneDrawable};

use crate::shapes::{self, ProceduralGround};

/// Per-object uniform names
mod names {
    pub const MODEL_TR: &str = "ModelTr";
    pub const NORMAL_TR: &str = "NormalTr";
    pub const OBJECT_ID: &str = "objectId";
    pub const DIFFUSE: &str = "diffuse";
    pub const SPECULAR: &str = "specular";
    pub const SHININESS: &str = "shininess";
}

/// Object identifiers the shaders switch on to pick textures and effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ObjectId {
    Null = 0,
    Sky = 1,
    Sea = 2,
    Ground = 3,
    Room = 4,
    Podium = 5,
    Frame = 6,
    LeftPicture = 7,
    RightPicture = 8,
    Teapot = 9,
    Spheres = 10,
    Floor = 11,
}

/// Kd, Ks and specular exponent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
}

impl Surface {
    pub fn new(diffuse: Vec3, specular: Vec3, shininess: f32) -> Self {
        Self {
            diffuse,
            specular,
            shininess,
        }
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(Vec3::zeros(), Vec3::zeros(), 1.0)
    }
}

/// A node in the scene tree
#[derive(Debug, Clone)]
pub struct Object {
    pub id: ObjectId,
    pub mesh: Option<MeshHandle>,
    pub surface: Surface,
    /// Skipped by the reflection passes
    pub reflective: bool,
    /// Children are rotated by the frame's animation matrix
    pub animated: bool,
    children: Vec<(Object, Mat4)>,
}

impl Object {
    /// Grouping node with no geometry
    pub fn group() -> Self {
        Self {
            id: ObjectId::Null,
            mesh: None,
            surface: Surface::default(),
            reflective: false,
            animated: false,
            children: Vec::new(),
        }
    }

    pub fn new(mesh: MeshHandle, id: ObjectId, surface: Surface) -> Self {
        Self {
            id,
            mesh: Some(mesh),
            surface,
            ..Self::group()
        }
    }

    pub fn reflective(mut self) -> Self {
        self.reflective = true;
        self
    }

    pub fn animated(mut self) -> Self {
        self.animated = true;
        self
    }

    /// Add an instance of `child` placed by `transform`
    pub fn add(&mut self, child: Object, transform: Mat4) -> &mut Self {
        self.children.push((child, transform));
        self
    }
}

/// GPU meshes the scene is assembled from
#[derive(Debug, Clone, Copy)]
pub struct SceneMeshes {
    pub teapot: MeshHandle,
    /// Places the teapot mesh on the podium
    pub teapot_fit: Mat4,
    pub cube: MeshHandle,
    pub sphere: MeshHandle,
    pub room: MeshHandle,
    pub floor: MeshHandle,
    pub quad: MeshHandle,
    pub sea: MeshHandle,
    pub ground: MeshHandle,
}

impl SceneMeshes {
    /// Generate and upload every shape.
    ///
    /// The teapot comes from `teapot.obj` under `model_dir`; a sphere stands in
    /// when that file is missing or unreadable.
    pub fn upload<D: GraphicsDevice + ?Sized>(
        device: &mut D,
        model_dir: &Path,
        ground: &ProceduralGround,
    ) -> RenderResult<Self> {
        let teapot_path = model_dir.join("teapot.obj");
        let (teapot, teapot_fit) = match ObjLoader::load_obj(&teapot_path) {
            Ok(mesh) => (
                device.create_mesh(&mesh)?,
                translate(0.1, 0.0, 1.0) * rotate(Axis::X, 90.0) * scale(0.3, 0.3, 0.3),
            ),
            Err(e) => {
                log::warn!("Teapot model {:?} unavailable ({e}); using a sphere", teapot_path);
                (device.create_mesh(&shapes::sphere(32))?, translate(0.1, 0.0, 1.5) * scale(0.5, 0.5, 0.5))
            }
        };

        let meshes = Self {
            teapot,
            teapot_fit,
            cube: device.create_mesh(&shapes::cube())?,
            sphere: device.create_mesh(&shapes::sphere(32))?,
            room: device.create_mesh(&shapes::room(10.0, 10.0, 4.0))?,
            floor: device.create_mesh(&shapes::plane(10.0, 10))?,
            quad: device.create_mesh(&shapes::quad())?,
            sea: device.create_mesh(&shapes::plane(2000.0, 50))?,
            ground: device.create_mesh(&ground.mesh())?,
        };
        log::info!("Uploaded scene meshes");
        Ok(meshes)
    }
}

/// The whole demonstration scene
#[derive(Debug, Clone)]
pub struct Scene {
    root: Object,
    animation: Mat4,
}

impl Scene {
    pub fn from_root(root: Object) -> Self {
        Self {
            root,
            animation: Mat4::identity(),
        }
    }

    /// Sky, sea and island around a room holding a teapot on a podium, ringed by
    /// a hemisphere of colored spheres, with two framed pictures on the far wall.
    pub fn build(meshes: &SceneMeshes) -> Self {
        let wood = Vec3::new(87.0, 51.0, 35.0) / 255.0;
        let brick = Vec3::new(134.0, 60.0, 56.0) / 255.0;
        let floor_color = Vec3::new(6.0 * 16.0, 5.5 * 16.0, 3.0 * 16.0) / 255.0;
        let brass = Vec3::new(0.5, 0.5, 0.1);
        let grass = Vec3::new(62.0, 102.0, 38.0) / 255.0;
        let water = Vec3::new(0.3, 0.3, 1.0);
        let black = Vec3::zeros();
        let bright = Vec3::repeat(0.03);
        let polished = Vec3::repeat(0.01);

        let mut anim = Object::group().animated();
        anim.add(
            Object::new(meshes.teapot, ObjectId::Teapot, Surface::new(brass, bright, 120.0)).reflective(),
            meshes.teapot_fit,
        );
        anim.add(sphere_of_spheres(meshes.sphere), scale(30.0, 30.0, 30.0));

        let mut central = Object::group();
        central.add(
            Object::new(meshes.cube, ObjectId::Podium, Surface::new(wood, polished, 10.0)),
            Mat4::identity(),
        );
        central.add(anim, Mat4::identity());

        let mut room = Object::new(meshes.room, ObjectId::Room, Surface::new(brick, black, 1.0));
        let picture_scale = scale(0.8, 0.8, 0.8);
        room.add(
            framed_picture(meshes, ObjectId::LeftPicture),
            translate(-1.5, 9.85, 1.0) * picture_scale,
        );
        room.add(
            framed_picture(meshes, ObjectId::RightPicture),
            translate(1.5, 9.85, 1.0) * picture_scale,
        );

        let mut root = Object::group();
        root.add(
            Object::new(meshes.sphere, ObjectId::Sky, Surface::new(black, black, 0.0)),
            scale(2000.0, 2000.0, 2000.0),
        )
        .add(
            Object::new(meshes.sea, ObjectId::Sea, Surface::new(water, bright, 120.0)),
            Mat4::identity(),
        )
        .add(
            Object::new(meshes.ground, ObjectId::Ground, Surface::new(grass, black, 1.0)),
            Mat4::identity(),
        )
        .add(central, Mat4::identity())
        .add(room, translate(0.0, 0.0, 0.02))
        .add(
            Object::new(meshes.floor, ObjectId::Floor, Surface::new(floor_color, black, 1.0)),
            translate(0.0, 0.0, 0.02),
        );

        Self::from_root(root)
    }

    /// Walk the tree depth-first, calling `visit` with each object and its
    /// accumulated model transform. Reflective objects and their subtrees are
    /// skipped when `skip_reflective` is set.
    pub fn walk<F>(&self, base: &Mat4, skip_reflective: bool, mut visit: F) -> RenderResult<()>
    where
        F: FnMut(&Object, &Mat4) -> RenderResult<()>,
    {
        self.walk_object(&self.root, base, skip_reflective, &mut visit)
    }

    fn walk_object<F>(&self, object: &Object, transform: &Mat4, skip_reflective: bool, visit: &mut F) -> RenderResult<()>
    where
        F: FnMut(&Object, &Mat4) -> RenderResult<()>,
    {
        if skip_reflective && object.reflective {
            return Ok(());
        }
        visit(object, transform)?;

        let local = if object.animated {
            transform * self.animation
        } else {
            *transform
        };
        for (child, placement) in &object.children {
            self.walk_object(child, &(local * placement), skip_reflective, visit)?;
        }
        Ok(())
    }

    fn draw_filtered(&self, program: &mut ActiveProgram<'_, '_>, base: &Mat4, skip_reflective: bool) -> RenderResult<()> {
        self.walk(base, skip_reflective, |object, model| {
            let Some(mesh) = object.mesh else {
                return Ok(());
            };
            let inverse = model.try_inverse().unwrap_or_else(Mat4::identity);
            program.set_vec3(names::DIFFUSE, object.surface.diffuse);
            program.set_vec3(names::SPECULAR, object.surface.specular);
            program.set_float(names::SHININESS, object.surface.shininess);
            program.set_int(names::OBJECT_ID, object.id as i32);
            program.set_mat4(names::MODEL_TR, model);
            program.set_mat4(names::NORMAL_TR, &inverse);
            program.draw_mesh(mesh);
            Ok(())
        })
    }
}

impl SceneDrawable for Scene {
    fn draw(&self, program: &mut ActiveProgram<'_, '_>, base: &Mat4) -> RenderResult<()> {
        self.draw_filtered(program, base, false)
    }

    fn draw_nonreflective(&self, program: &mut ActiveProgram<'_, '_>, base: &Mat4) -> RenderResult<()> {
        self.draw_filtered(program, base, true)
    }

    fn set_animation(&mut self, rotation: &Mat4) {
        self.animation = *rotation;
    }
}

/// A hemisphere of small spheres, hue varying with angle and saturation with height
fn sphere_of_spheres(sphere: MeshHandle) -> Object {
    let mut group = Object::group();
    let row_step = std::f32::consts::FRAC_PI_2 / 6.0;

    for step in 0..20 {
        let angle = step as f32 * 18.0;
        let mut row = 0.075_f32;
        while row < std::f32::consts::FRAC_PI_2 {
            let hue = hsv_to_rgb(angle / 360.0, 1.0 - 2.0 * row / std::f32::consts::PI, 1.0);
            let ball = Object::new(sphere, ObjectId::Spheres, Surface::new(hue, Vec3::repeat(1.0), 120.0));
            let (s, c) = row.sin_cos();
            group.add(
                ball,
                rotate(Axis::Z, angle) * translate(c, 0.0, s) * scale(0.075 * c, 0.075 * c, 0.075 * c),
            );
            row += row_step;
        }
    }
    group
}

/// A -1..+1 picture quad in the XZ plane framed by four thin boxes
fn framed_picture(meshes: &SceneMeshes, picture: ObjectId) -> Object {
    let w = 0.05;
    let wood = Vec3::new(87.0, 51.0, 35.0) / 255.0;
    let board = Object::new(meshes.cube, ObjectId::Frame, Surface::new(wood, Vec3::repeat(0.2), 10.0));

    let mut frame = Object::group();
    frame
        .add(board.clone(), translate(0.0, 0.0, 1.0 + w) * scale(1.0, w, w))
        .add(board.clone(), translate(0.0, 0.0, -1.0 - w) * scale(1.0, w, w))
        .add(board.clone(), translate(1.0 + w, 0.0, 0.0) * scale(w, w, 1.0 + 2.0 * w))
        .add(board, translate(-1.0 - w, 0.0, 0.0) * scale(w, w, 1.0 + 2.0 * w))
        .add(
            Object::new(meshes.quad, picture, Surface::new(wood, Vec3::zeros(), 10.0)),
            rotate(Axis::X, 90.0),
        );
    frame
}

/// Hue, saturation and value in 0..1 to linear RGB
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    if s == 0.0 {
        return Vec3::repeat(v);
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i32).rem_euclid(6) {
        0 => Vec3::new(v, t, p),
        1 => Vec3::new(q, v, p),
        2 => Vec3::new(p, v, t),
        3 => Vec3::new(p, q, v),
        4 => Vec3::new(t, p, v),
        _ => Vec3::new(v, p, q),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use deferred_engine::render::backends::{Command, RecordingDevice};
    use deferred_engine::render::{ShaderProgram, StageKind, UniformValue};

    fn small_ground() -> ProceduralGround {
        ProceduralGround {
            resolution: 8,
            ..ProceduralGround::default()
        }
    }

    fn scene(device: &mut RecordingDevice) -> (Scene, SceneMeshes) {
        let meshes = SceneMeshes::upload(device, Path::new("no/such/models"), &small_ground()).unwrap();
        (Scene::build(&meshes), meshes)
    }

    fn program(device: &mut RecordingDevice) -> ShaderProgram {
        let mut program = ShaderProgram::new("scene");
        program.add_stage(StageKind::Vertex, "scene.vert", "void main() {}").unwrap();
        program.add_stage(StageKind::Fragment, "scene.frag", "void main() {}").unwrap();
        program.link(device).unwrap();
        program
    }

    fn draws(device: &RecordingDevice) -> usize {
        device.commands().iter().filter(|c| matches!(c, Command::DrawMesh(_))).count()
    }

    fn count(scene: &Scene, skip_reflective: bool, id: ObjectId) -> usize {
        let mut n = 0;
        scene
            .walk(&Mat4::identity(), skip_reflective, |object, _| {
                n += usize::from(object.id == id && object.mesh.is_some());
                Ok(())
            })
            .unwrap();
        n
    }

    #[test]
    fn test_scene_contents() {
        let mut device = RecordingDevice::new();
        let (scene, _) = scene(&mut device);
        assert_eq!(count(&scene, false, ObjectId::Teapot), 1);
        assert_eq!(count(&scene, false, ObjectId::Spheres), 120);
        assert_eq!(count(&scene, false, ObjectId::Frame), 8);
        assert_eq!(count(&scene, false, ObjectId::LeftPicture), 1);
        assert_eq!(count(&scene, false, ObjectId::RightPicture), 1);
    }

    #[test]
    fn test_nonreflective_draw_skips_teapot() {
        let mut device = RecordingDevice::new();
        let (scene, _) = scene(&mut device);
        let program = program(&mut device);

        device.clear_commands();
        {
            let dyn_device: &mut dyn GraphicsDevice = &mut device;
            let mut active = program.activate(dyn_device).unwrap();
            scene.draw(&mut active, &Mat4::identity()).unwrap();
        }
        let all = draws(&device);

        device.clear_commands();
        {
            let dyn_device: &mut dyn GraphicsDevice = &mut device;
            let mut active = program.activate(dyn_device).unwrap();
            scene.draw_nonreflective(&mut active, &Mat4::identity()).unwrap();
        }
        assert_eq!(draws(&device), all - 1);
        assert_eq!(count(&scene, true, ObjectId::Teapot), 0);
        assert_eq!(count(&scene, true, ObjectId::Spheres), 120);
    }

    #[test]
    fn test_animation_rotates_teapot_about_origin() {
        let mut device = RecordingDevice::new();
        let (mut scene, meshes) = scene(&mut device);
        let spin = rotate(Axis::Z, 90.0);
        scene.set_animation(&spin);

        let mut teapot = None;
        let mut podium = None;
        scene
            .walk(&Mat4::identity(), false, |object, model| {
                match object.id {
                    ObjectId::Teapot => teapot = Some(*model),
                    ObjectId::Podium => podium = Some(*model),
                    _ => {}
                }
                Ok(())
            })
            .unwrap();

        assert_relative_eq!(teapot.unwrap(), spin * meshes.teapot_fit, epsilon = 1e-6);
        assert_relative_eq!(podium.unwrap(), Mat4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_base_transform_prefixes_every_object() {
        let mut device = RecordingDevice::new();
        let (scene, _) = scene(&mut device);
        let base = translate(0.0, 0.0, 5.0);

        let mut sky = None;
        scene
            .walk(&base, false, |object, model| {
                if object.id == ObjectId::Sky {
                    sky = Some(*model);
                }
                Ok(())
            })
            .unwrap();
        assert_relative_eq!(sky.unwrap(), base * scale(2000.0, 2000.0, 2000.0), epsilon = 1e-3);
    }

    #[test]
    fn test_per_object_uniforms() {
        let mut device = RecordingDevice::new();
        let mesh = device.create_mesh(&shapes::cube()).unwrap();
        let program = program(&mut device);
        let surface = Surface::new(Vec3::new(0.5, 0.25, 0.125), Vec3::repeat(0.03), 120.0);
        let mut root = Object::group();
        root.add(Object::new(mesh, ObjectId::Podium, surface), translate(1.0, 2.0, 3.0) * scale(2.0, 2.0, 2.0));
        let scene = Scene::from_root(root);

        {
            let dyn_device: &mut dyn GraphicsDevice = &mut device;
            let mut active = program.activate(dyn_device).unwrap();
            scene.draw(&mut active, &Mat4::identity()).unwrap();
        }

        assert_eq!(device.uniform("objectId"), Some(&UniformValue::Int(ObjectId::Podium as i32)));
        assert_eq!(device.uniform("shininess"), Some(&UniformValue::Float(120.0)));
        assert_eq!(device.uniform("diffuse"), Some(&UniformValue::Vec3(surface.diffuse)));
        let (Some(UniformValue::Mat4(model)), Some(UniformValue::Mat4(normal))) =
            (device.uniform("ModelTr"), device.uniform("NormalTr"))
        else {
            panic!("transforms not set");
        };
        assert_relative_eq!(model * normal, Mat4::identity(), epsilon = 1e-5);
        assert_eq!(draws(&device), 1);
    }

    #[test]
    fn test_missing_teapot_model_falls_back_to_sphere() {
        let mut device = RecordingDevice::new();
        let (_, meshes) = scene(&mut device);
        assert_relative_eq!(meshes.teapot_fit, translate(0.1, 0.0, 1.5) * scale(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_hsv_primaries() {
        assert_relative_eq!(hsv_to_rgb(0.0, 1.0, 1.0), Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(hsv_to_rgb(1.0 / 3.0, 1.0, 1.0), Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(hsv_to_rgb(2.0 / 3.0, 1.0, 1.0), Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(hsv_to_rgb(0.4, 0.0, 0.7), Vec3::repeat(0.7));
    }
}
