mod affine;
mod eigen;
mod online;
