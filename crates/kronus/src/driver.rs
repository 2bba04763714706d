//! 平台驱动与设备绑定
//!
//! 探测流程：
//!
//! 1. 确定 UIO 描述：有设备树节点时由节点生成，否则使用平台数据；
//! 2. 拒绝预设了中断回调或请求共享中断的描述；
//! 3. 描述未指定中断时查询平台中断，不存在则以无中断方式工作；
//! 4. 映射寄存器窗口，复位设备并屏蔽中断；
//! 5. 以仲裁器作为回调登记 UIO 设备。
//!
//! 第 4 步之前不访问硬件。

use alloc::{
    string::{String, ToString},
    sync::Arc,
    vec,
};
use device::{
    DeviceError, DeviceType, Driver, IrqFlags, OfDeviceId, PlatformDevice, PlatformDriver,
    ResourceFlags,
};
use uio::{IrqLine, UioDevice, UioInfo, UioMem};

use crate::arbiter::IrqArbiter;
use crate::config::{DRIVER_NAME, OF_COMPATIBLE, OF_UIO_NAME_PROP, OF_UIO_VERSION};
use crate::error::ProbeError;
use crate::regs::KronusRegs;

static KRONUS_OF_MATCH: [OfDeviceId; 1] = [OfDeviceId {
    compatible: OF_COMPATIBLE,
}];

/// Kronus 平台驱动
pub struct KronusDriver;

impl PlatformDriver for KronusDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn of_match_table(&self) -> &'static [OfDeviceId] {
        &KRONUS_OF_MATCH
    }

    fn probe(&self, dev: &PlatformDevice) -> Result<Arc<dyn Driver>, DeviceError> {
        let bound = KronusUio::probe(dev)?;
        Ok(Arc::new(bound))
    }
}

/// 已绑定的 Kronus 设备
///
/// 被丢弃时先注销 UIO 设备（释放中断线，收回使用者句柄上的回调），
/// 再释放仲裁器；仲裁器屏蔽设备中断后解除寄存器映射。
pub struct KronusUio {
    // 字段按声明顺序析构
    uio: UioDevice,
    arbiter: Arc<IrqArbiter>,
}

impl KronusUio {
    /// 绑定一个平台设备
    pub fn probe(dev: &PlatformDevice) -> Result<Self, ProbeError> {
        Self::try_probe(dev).inspect_err(|err| match err {
            ProbeError::Defer => log::debug!("{}: probe deferred: {}", dev.name(), err),
            _ => log::error!("{}: {}", dev.name(), err),
        })
    }

    fn try_probe(dev: &PlatformDevice) -> Result<Self, ProbeError> {
        let mut info = match dev.of_node() {
            Some(node) => {
                let name = node
                    .property_read_string(OF_UIO_NAME_PROP)
                    .unwrap_or(node.name());
                UioInfo::new(name, OF_UIO_VERSION)
            }
            None => dev
                .platform_data::<UioInfo>()
                .cloned()
                .ok_or(ProbeError::Config("missing platform data"))?,
        };

        let name = match (&info.name, &info.version) {
            (Some(name), Some(version)) if !name.is_empty() && !version.is_empty() => {
                name.clone()
            }
            _ => return Err(ProbeError::Config("missing platform data")),
        };

        if info.handler.is_some() || info.irq_flags.contains(IrqFlags::SHARED) {
            return Err(ProbeError::Config("interrupt configuration error"));
        }

        if info.irq == IrqLine::Unset {
            info.irq = match dev.irq(0) {
                Ok(irq) => IrqLine::Irq(irq),
                Err(DeviceError::NotFound) => IrqLine::None,
                Err(DeviceError::ProbeDefer) => return Err(ProbeError::Defer),
                Err(e) => return Err(ProbeError::Irq(e)),
            };
        }

        let res = dev
            .get_resource(ResourceFlags::MEM, 0)
            .ok_or(ProbeError::Map(DeviceError::InvalidArgument))?;
        info.mem = vec![UioMem::from_resource(res)];

        let io = dev.ioremap_resource(res).map_err(ProbeError::Map)?;
        let regs = KronusRegs::new(io).map_err(ProbeError::Map)?;

        let arbiter = Arc::new(IrqArbiter::new(regs));
        arbiter.reset();
        info.handler = Some(arbiter.clone());

        // 失败时仲裁器随之释放，设备保持屏蔽
        let uio = uio::register_device(info).map_err(ProbeError::Register)?;

        log::info!("registered device: {}", name);
        Ok(Self { uio, arbiter })
    }

    /// 登记的 UIO 设备
    pub fn uio(&self) -> &UioDevice {
        &self.uio
    }

    /// 中断仲裁器
    pub fn arbiter(&self) -> &IrqArbiter {
        &self.arbiter
    }
}

impl Driver for KronusUio {
    fn device_type(&self) -> DeviceType {
        DeviceType::Uio
    }

    fn get_id(&self) -> String {
        self.uio.name().to_string()
    }
}

impl Drop for KronusUio {
    fn drop(&mut self) {
        log::debug!("{}: detaching", self.uio.name());
    }
}
