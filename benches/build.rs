// bench.rs
#![feature(test)]
#![allow(incomplete_features)]
#![feature(generic_const_exprs)]
extern crate test;

#[cfg(test)]
mod benchmarks {
    use test::Bencher;

    use rand::{thread_rng, Rng};

    use glam::Vec3A;

    use mesh_bvh::*;

    static TRIANGLES_NUM: usize = 1024;

    fn random_mesh(triangle_count: usize) -> (Vec<Vec3A>, Vec<u32>) {
        let mut rng = thread_rng();
        let vertices: Vec<Vec3A> = (0..triangle_count * 3)
            .map(|_| rng.gen::<Vec3A>() * 9.0 - Vec3A::splat(5.0))
            .collect();
        let indices: Vec<u32> = (0..vertices.len() as u32).collect();
        (vertices, indices)
    }

    #[bench]
    fn build_bvh(b: &mut Bencher) {
        let (vertices, indices) = random_mesh(TRIANGLES_NUM);

        b.bytes = TRIANGLES_NUM as u64;
        b.iter(|| {
            let mut bvh = BVH::default();
            bvh.build(&vertices, &indices, 2);
            bvh
        });
    }

    #[bench]
    fn build_obb_bvh(b: &mut Bencher) {
        // PCA refits per candidate split make this one far heavier per
        // triangle, keep the soup small
        let (vertices, indices) = random_mesh(128);

        b.bytes = 128;
        b.iter(|| {
            let mut bvh = OBBBVH::default();
            bvh.build(&vertices, &indices, 2);
            bvh
        });
    }

    #[bench]
    fn flatten_wide(b: &mut Bencher) {
        let (vertices, indices) = random_mesh(TRIANGLES_NUM);
        let mut bvh = BVH::default();
        bvh.build(&vertices, &indices, 2);

        b.bytes = TRIANGLES_NUM as u64;
        b.iter(|| bvh.make_wide::<2>());
    }

    #[bench]
    fn pack_for_upload(b: &mut Bencher) {
        let (vertices, indices) = random_mesh(TRIANGLES_NUM);
        let mut bvh = BVH::default();
        bvh.build(&vertices, &indices, 2);

        b.bytes = TRIANGLES_NUM as u64;
        b.iter(|| (bvh.pack_nodes(), bvh.pack_triangles()));
    }
}
