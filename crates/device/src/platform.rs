//! 平台设备与平台驱动
//!
//! 平台总线负责把 [`PlatformDevice`] 与 [`PlatformDriver`] 配对：
//!
//! - 匹配规则：设备树节点的 `compatible` 命中驱动的匹配表，或设备名与驱动名相同；
//! - 探测成功后总线持有驱动返回的 [`Driver`] 实例，实例被丢弃即设备解绑；
//! - 探测返回 [`DeviceError::ProbeDefer`] 的设备被放入延迟队列，
//!   之后由 [`PlatformBus::retry_deferred`] 或新驱动注册时重新探测；
//! - 其它探测错误是永久性的，设备保持未绑定状态。

use alloc::{string::String, sync::Arc, vec::Vec};
use core::any::Any;
use lazy_static::lazy_static;
use sync::SpinLock;

use crate::driver::Driver;
use crate::error::DeviceError;
use crate::io::{IoMapper, RegisterIo};
use crate::of::{OfDeviceId, OfNode};
use crate::resource::{Resource, ResourceFlags};

/// 平台设备
///
/// 由宿主内核的设备发现流程构造，描述设备的身份、资源、中断和平台数据。
pub struct PlatformDevice {
    name: String,
    of_node: Option<OfNode>,
    resources: Vec<Resource>,
    irqs: Vec<Result<u32, DeviceError>>,
    platform_data: Option<Arc<dyn Any + Send + Sync>>,
    mapper: Arc<dyn IoMapper>,
}

impl PlatformDevice {
    /// 创建一个平台设备，`mapper` 用于映射其内存资源
    pub fn new(name: &str, mapper: Arc<dyn IoMapper>) -> Self {
        Self {
            name: String::from(name),
            of_node: None,
            resources: Vec::new(),
            irqs: Vec::new(),
            platform_data: None,
            mapper,
        }
    }

    /// 关联设备树节点
    pub fn with_of_node(mut self, node: OfNode) -> Self {
        self.of_node = Some(node);
        self
    }

    /// 追加一个资源
    pub fn with_resource(mut self, res: Resource) -> Self {
        self.resources.push(res);
        self
    }

    /// 追加一个中断查询结果
    ///
    /// 宿主内核解析中断时可能得到中断号，也可能得到错误
    /// （例如中断控制器尚未就绪时的 [`DeviceError::ProbeDefer`]）。
    pub fn with_irq(mut self, irq: Result<u32, DeviceError>) -> Self {
        self.irqs.push(irq);
        self
    }

    /// 设置平台数据
    pub fn with_platform_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.platform_data = Some(Arc::new(data));
        self
    }

    /// 设备名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 设备树节点
    pub fn of_node(&self) -> Option<&OfNode> {
        self.of_node.as_ref()
    }

    /// 以指定类型读取平台数据，类型不符时返回 None
    pub fn platform_data<T: Any>(&self) -> Option<&T> {
        self.platform_data.as_deref()?.downcast_ref::<T>()
    }

    /// 获取第 `index` 个指定类型的资源
    pub fn get_resource(&self, flags: ResourceFlags, index: usize) -> Option<&Resource> {
        self.resources
            .iter()
            .filter(|r| r.flags.contains(flags))
            .nth(index)
    }

    /// 查询第 `index` 个中断
    ///
    /// 不存在时返回 [`DeviceError::NotFound`]。
    pub fn irq(&self, index: usize) -> Result<u32, DeviceError> {
        self.irqs
            .get(index)
            .copied()
            .unwrap_or(Err(DeviceError::NotFound))
    }

    /// 映射一个内存资源
    pub fn ioremap_resource(&self, res: &Resource) -> Result<Arc<dyn RegisterIo>, DeviceError> {
        if !res.is_mem() || res.size == 0 {
            return Err(DeviceError::InvalidArgument);
        }
        self.mapper.ioremap(res)
    }
}

/// 平台驱动
pub trait PlatformDriver: Send + Sync {
    /// 驱动名，设备名与之相同时也视为匹配
    fn name(&self) -> &'static str;

    /// 设备树匹配表
    fn of_match_table(&self) -> &'static [OfDeviceId] {
        &[]
    }

    /// 探测并绑定设备
    ///
    /// 成功时返回已绑定的设备实例；返回 [`DeviceError::ProbeDefer`] 表示稍后重试。
    fn probe(&self, dev: &PlatformDevice) -> Result<Arc<dyn Driver>, DeviceError>;
}

fn driver_matches(drv: &dyn PlatformDriver, dev: &PlatformDevice) -> bool {
    if let Some(node) = dev.of_node() {
        if node.match_table(drv.of_match_table()).is_some() {
            return true;
        }
    }
    dev.name() == drv.name()
}

struct Binding {
    device: Arc<PlatformDevice>,
    driver: &'static str,
    instance: Arc<dyn Driver>,
}

struct BusState {
    drivers: Vec<Arc<dyn PlatformDriver>>,
    unbound: Vec<Arc<PlatformDevice>>,
    deferred: Vec<Arc<PlatformDevice>>,
    bound: Vec<Binding>,
    /// 正在探测、尚未归档的设备
    probing: Vec<Arc<PlatformDevice>>,
}

impl BusState {
    fn contains_device(&self, name: &str) -> bool {
        self.unbound.iter().any(|d| d.name() == name)
            || self.deferred.iter().any(|d| d.name() == name)
            || self.bound.iter().any(|b| b.device.name() == name)
            || self.probing.iter().any(|d| d.name() == name)
    }

    fn finish_probe(&mut self, dev: &Arc<PlatformDevice>) {
        self.probing.retain(|d| !Arc::ptr_eq(d, dev));
    }
}

/// 平台总线
pub struct PlatformBus {
    state: SpinLock<BusState>,
}

impl PlatformBus {
    /// 创建空的平台总线
    pub const fn new() -> Self {
        Self {
            state: SpinLock::new(BusState {
                drivers: Vec::new(),
                unbound: Vec::new(),
                deferred: Vec::new(),
                bound: Vec::new(),
                probing: Vec::new(),
            }),
        }
    }

    /// 注册平台驱动，并对已存在的未绑定/延迟设备尝试探测
    pub fn register_driver(&self, drv: Arc<dyn PlatformDriver>) -> Result<(), DeviceError> {
        let pending = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if state.drivers.iter().any(|d| d.name() == drv.name()) {
                return Err(DeviceError::Busy);
            }
            state.drivers.push(drv.clone());

            let mut pending = Vec::new();
            for list in [&mut state.unbound, &mut state.deferred] {
                let (hit, keep): (Vec<_>, Vec<_>) =
                    list.drain(..).partition(|d| driver_matches(drv.as_ref(), d));
                *list = keep;
                pending.extend(hit);
            }
            state.probing.extend(pending.iter().cloned());
            pending
        };

        for dev in pending {
            // 单个设备的探测失败不影响驱动注册
            let _ = self.attach(dev);
        }
        Ok(())
    }

    /// 注销平台驱动，解绑其绑定的所有设备
    pub fn unregister_driver(&self, name: &str) -> Result<(), DeviceError> {
        let released = {
            let mut state = self.state.lock();
            let before = state.drivers.len();
            state.drivers.retain(|d| d.name() != name);
            if state.drivers.len() == before {
                return Err(DeviceError::NoDevice);
            }
            let (released, keep): (Vec<_>, Vec<_>) =
                state.bound.drain(..).partition(|b| b.driver == name);
            state.bound = keep;
            for b in &released {
                state.unbound.push(b.device.clone());
            }
            released
        };

        for b in released {
            log::debug!("{}: unbinding from {}", b.device.name(), b.driver);
            drop(b.instance);
        }
        Ok(())
    }

    /// 添加设备并立即尝试探测
    ///
    /// 探测被延迟时设备进入延迟队列，并返回 [`DeviceError::ProbeDefer`]；
    /// 其它探测错误原样返回，设备保持未绑定。没有匹配的驱动时返回 Ok。
    /// 同名设备已存在（包括正在探测中）时返回 [`DeviceError::Busy`]。
    pub fn add_device(&self, dev: PlatformDevice) -> Result<(), DeviceError> {
        let dev = Arc::new(dev);
        {
            let mut state = self.state.lock();
            if state.contains_device(dev.name()) {
                return Err(DeviceError::Busy);
            }
            state.probing.push(dev.clone());
        }
        self.attach(dev).map(|_| ())
    }

    /// 移除设备，已绑定的设备会先解绑
    ///
    /// 设备正在探测时返回 [`DeviceError::Busy`]。
    pub fn remove_device(&self, name: &str) -> Result<(), DeviceError> {
        let released = {
            let mut state = self.state.lock();
            if state.probing.iter().any(|d| d.name() == name) {
                return Err(DeviceError::Busy);
            }
            if let Some(pos) = state.bound.iter().position(|b| b.device.name() == name) {
                Some(state.bound.remove(pos))
            } else {
                let before = state.unbound.len() + state.deferred.len();
                state.unbound.retain(|d| d.name() != name);
                state.deferred.retain(|d| d.name() != name);
                if state.unbound.len() + state.deferred.len() == before {
                    return Err(DeviceError::NoDevice);
                }
                None
            }
        };

        if let Some(b) = released {
            log::debug!("{}: unbinding from {}", name, b.driver);
            drop(b.instance);
        }
        Ok(())
    }

    /// 重新探测延迟队列中的设备，返回本次成功绑定的设备数
    pub fn retry_deferred(&self) -> usize {
        let pending: Vec<_> = {
            let mut state = self.state.lock();
            let pending: Vec<_> = state.deferred.drain(..).collect();
            state.probing.extend(pending.iter().cloned());
            pending
        };
        pending
            .into_iter()
            .filter(|dev| matches!(self.attach(dev.clone()), Ok(true)))
            .count()
    }

    /// 设备是否已绑定
    pub fn is_bound(&self, name: &str) -> bool {
        self.state
            .lock()
            .bound
            .iter()
            .any(|b| b.device.name() == name)
    }

    /// 延迟队列中的设备数
    pub fn deferred_count(&self) -> usize {
        self.state.lock().deferred.len()
    }

    /// 已绑定设备实例的快照
    pub fn bound_instances(&self) -> Vec<Arc<dyn Driver>> {
        self.state
            .lock()
            .bound
            .iter()
            .map(|b| b.instance.clone())
            .collect()
    }

    /// 用当前驱动列表探测设备，并把设备归档到相应队列
    ///
    /// 调用者须已把设备放入 `probing`。返回设备是否被绑定；没有匹配驱动时返回 `Ok(false)`。
    /// 探测失败由驱动自行记录。
    fn attach(&self, dev: Arc<PlatformDevice>) -> Result<bool, DeviceError> {
        let drivers: Vec<_> = self
            .state
            .lock()
            .drivers
            .iter()
            .filter(|d| driver_matches(d.as_ref(), &dev))
            .cloned()
            .collect();

        let mut result = Ok(false);
        for drv in drivers {
            match drv.probe(&dev) {
                Ok(instance) => {
                    let mut state = self.state.lock();
                    state.finish_probe(&dev);
                    state.bound.push(Binding {
                        device: dev,
                        driver: drv.name(),
                        instance,
                    });
                    return Ok(true);
                }
                Err(DeviceError::ProbeDefer) => {
                    let mut state = self.state.lock();
                    state.finish_probe(&dev);
                    state.deferred.push(dev);
                    return Err(DeviceError::ProbeDefer);
                }
                Err(e) => result = Err(e),
            }
        }
        let mut state = self.state.lock();
        state.finish_probe(&dev);
        state.unbound.push(dev);
        result
    }
}

impl Default for PlatformBus {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    /// 全局平台总线
    pub static ref PLATFORM_BUS: PlatformBus = PlatformBus::new();
}
