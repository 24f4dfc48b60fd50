mod motion_instruction;
mod vec3d;

pub use motion_instruction::MotionInstruction;
pub use vec3d::Vec3D;
