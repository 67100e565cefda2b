use crate::domain::errors::DomainResult;
use crate::domain::payment_result::PaymentResult;
use crate::domain::value_objects::Money;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 网关下单参数（平台订单维度，适配器自行翻译为服务商报文）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentParams {
    /// 平台订单号
    pub order_no: String,

    /// 支付金额
    pub amount: Money,

    /// 同步跳转地址
    pub return_url: Option<String>,

    /// 下单终端IP
    pub client_ip: String,

    /// 商户透传数据
    pub extra: Option<Value>,
}

/// 支付网关端口接口
///
/// 所有实现必须把服务商原生响应翻译为 PaymentResult 信封；
/// 网络/协议失败收敛为 status=failed 的信封而不是抛错，
/// 调用方永远拿到结构化结果。
#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    /// 创建支付订单
    ///
    /// 服务商必填字段缺失时返回 ValidationError（指明字段），
    /// 任何网络调用之前完成校验。
    async fn create_payment(&self, params: CreatePaymentParams) -> DomainResult<PaymentResult>;

    /// 查询订单状态（幂等，供手工补单与定时对账反复调用）
    async fn query_status(&self, order_no: &str) -> DomainResult<PaymentResult>;

    /// 归一化回调报文
    ///
    /// 签名与来源IP校验由上游协作方完成，此处只做形状归一化。
    async fn parse_callback(&self, raw: Value) -> DomainResult<PaymentResult>;

    /// 服务商名称（注册与可观测性标记）
    fn service_name(&self) -> &'static str;

    /// 服务类型（qrcode/redirect/h5）
    fn service_type(&self) -> &'static str;
}
