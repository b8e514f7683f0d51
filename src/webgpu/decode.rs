//! DFloat11 decode GPU kernel (host side).

use super::*;
use crate::bundle::Bundle;

impl WebGpuEngine {
    /// GPU-accelerated decode of a DFloat11 bundle.
    ///
    /// Each group is decoded by one GPU invocation, positioned at its
    /// resume point. Produces output identical to the CPU decoder.
    pub fn df11_decode(&self, bundle: &Bundle) -> Df11Result<Vec<u16>> {
        if bundle.n_elements == 0 {
            bundle.validate()?;
            return Ok(Vec::new());
        }

        let output_buf = self.df11_decode_run(bundle)?;

        let output_u32_count = bundle.n_elements.div_ceil(2);
        let raw = self.read_buffer(&output_buf, (output_u32_count * 4) as u64);
        let words = raw[..bundle.n_elements * 2]
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect();
        Ok(words)
    }

    /// GPU decode that leaves the tensor on the device.
    ///
    /// The returned buffer holds `n_elements` little-endian u16 words.
    /// Use this when the decoded weights feed directly into GPU compute
    /// without a host round-trip.
    pub fn df11_decode_to_device(&self, bundle: &Bundle) -> Df11Result<DeviceBuf> {
        if bundle.n_elements == 0 {
            bundle.validate()?;
            let buf = self.create_buffer(
                "df11_output_empty",
                4,
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            );
            return Ok(DeviceBuf { buf, len: 0 });
        }

        let buf = self.df11_decode_run(bundle)?;
        Ok(DeviceBuf {
            buf,
            len: bundle.n_elements * 2,
        })
    }

    /// Upload a bundle, dispatch the decode kernel, and return the
    /// output buffer (still on device, work already awaited).
    fn df11_decode_run(&self, bundle: &Bundle) -> Df11Result<wgpu::Buffer> {
        bundle.validate()?;
        let tables = bundle.tables()?;

        if bundle.n_elements > self.max_dispatch_elements() {
            return Err(Df11Error::Unsupported);
        }

        let n_groups = bundle.n_groups();

        // Window tables, packed one entry per u32.
        let packed_luts = tables.packed_u32();
        let luts_buf = self.create_buffer_init(
            "df11_luts",
            bytemuck::cast_slice(&packed_luts),
            wgpu::BufferUsages::STORAGE,
        );

        let codes_buf = self.create_buffer_init(
            "df11_codes",
            &Self::pad_input_bytes(&bundle.codes),
            wgpu::BufferUsages::STORAGE,
        );

        let sm_buf = self.create_buffer_init(
            "df11_sign_mantissa",
            &Self::pad_input_bytes(&bundle.sign_mantissa),
            wgpu::BufferUsages::STORAGE,
        );

        // Resume metadata, stride 3 per group, with a sentinel triple so
        // the last group reads its end bound like every other.
        let mut group_meta: Vec<u32> = Vec::with_capacity((n_groups + 1) * 3);
        for g in 0..n_groups {
            group_meta.push(bundle.position_offsets[g]);
            group_meta.push(bundle.gaps[g] as u32);
            group_meta.push(bundle.output_positions[g]);
        }
        group_meta.push(0);
        group_meta.push(0);
        group_meta.push(bundle.n_elements as u32);
        let group_meta_buf = self.create_buffer_init(
            "df11_group_meta",
            bytemuck::cast_slice(&group_meta),
            wgpu::BufferUsages::STORAGE,
        );

        // Output: two u16 words per u32, zero-initialized because the
        // kernel stores via atomicOr.
        let output_u32_count = bundle.n_elements.div_ceil(2);
        let output_buf = self.create_buffer_init(
            "df11_output",
            &vec![0u8; output_u32_count * 4],
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        );

        let workgroups = (n_groups as u32).div_ceil(DECODE_WORKGROUP_SIZE);
        let dispatch_width = self.dispatch_width(workgroups, DECODE_WORKGROUP_SIZE);

        let params = [
            bundle.n_luts as u32,
            bundle.n_bytes() as u32,
            bundle.n_elements as u32,
            n_groups as u32,
            dispatch_width,
            0u32,
            0u32,
            0u32,
        ];
        let params_buf = self.create_buffer_init(
            "df11_params",
            bytemuck::cast_slice(&params),
            wgpu::BufferUsages::UNIFORM,
        );

        let bg_layout = self.pipeline_df11_decode().get_bind_group_layout(0);
        let bg = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("df11_decode_bg"),
            layout: &bg_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: luts_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: codes_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: sm_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: group_meta_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: output_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: params_buf.as_entire_binding(),
                },
            ],
        });

        self.dispatch(self.pipeline_df11_decode(), &bg, workgroups, "df11_decode")?;
        self.poll_wait();

        Ok(output_buf)
    }
}
