use std::{collections::HashMap, sync::Arc};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::Utc;
use lms_core::{
    domain::{
        entities::payments::{CheckoutSessionChangeset, InsertPaymentEntity, UpdatePaymentEntity},
        repositories::{
            courses::CourseRepository, lessons::LessonRepository, payments::PaymentRepository,
        },
        value_objects::{
            access_policy::{Action, Actor, ResourceKind},
            enums::{payment_methods::PaymentMethod, payment_statuses::PaymentStatus},
            money::to_minor_units,
            payments::{CheckoutDto, CheckoutModel, ListPaymentsQuery, PaymentDto, PaymentModel},
        },
    },
    payments::stripe_client::{CheckoutSessionHandle, StripeClient, StripeEvent},
};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::usecases::{
    authorize,
    errors::{REQUIRED_FIELD, UseCaseError, UseCaseResult},
};

const POSITIVE_AMOUNT: &str = "Ensure this value is greater than 0.";
const AMOUNT_TOO_LARGE: &str = "Ensure this value is a valid amount.";

/// Maps an API amount to minor units or a field error on `amount`.
fn minor_units(amount: Decimal) -> UseCaseResult<i64> {
    to_minor_units(amount).ok_or_else(|| {
        if amount > Decimal::ZERO {
            UseCaseError::field("amount", AMOUNT_TOO_LARGE)
        } else {
            UseCaseError::field("amount", POSITIVE_AMOUNT)
        }
    })
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_product(&self, name: &str) -> AnyResult<String>;

    async fn create_price(&self, product_id: &str, unit_amount: i64) -> AnyResult<String>;

    async fn create_checkout_session(
        &self,
        price_id: &str,
        metadata: HashMap<String, String>,
    ) -> AnyResult<CheckoutSessionHandle>;

    async fn archive_product(&self, product_id: &str) -> AnyResult<()>;

    async fn deactivate_price(&self, price_id: &str) -> AnyResult<()>;

    async fn expire_checkout_session(&self, session_id: &str) -> AnyResult<()>;

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_product(&self, name: &str) -> AnyResult<String> {
        self.create_product(name).await
    }

    async fn create_price(&self, product_id: &str, unit_amount: i64) -> AnyResult<String> {
        self.create_price(product_id, unit_amount).await
    }

    async fn create_checkout_session(
        &self,
        price_id: &str,
        metadata: HashMap<String, String>,
    ) -> AnyResult<CheckoutSessionHandle> {
        self.create_checkout_session(price_id, metadata).await
    }

    async fn archive_product(&self, product_id: &str) -> AnyResult<()> {
        self.archive_product(product_id).await
    }

    async fn deactivate_price(&self, price_id: &str) -> AnyResult<()> {
        self.deactivate_price(price_id).await
    }

    async fn expire_checkout_session(&self, session_id: &str) -> AnyResult<()> {
        self.expire_checkout_session(session_id).await
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent> {
        self.verify_webhook_signature(payload, signature)
    }
}

/// Upstream objects created so far during a checkout, undone on failure.
#[derive(Debug, Default)]
struct CreatedUpstream {
    product_id: Option<String>,
    price_id: Option<String>,
    session_id: Option<String>,
}

pub struct PaymentUseCase<P, C, L, G>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
    L: LessonRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
    course_repo: Arc<C>,
    lesson_repo: Arc<L>,
    stripe_client: Arc<G>,
}

impl<P, C, L, G> PaymentUseCase<P, C, L, G>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
    L: LessonRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    pub fn new(
        payment_repo: Arc<P>,
        course_repo: Arc<C>,
        lesson_repo: Arc<L>,
        stripe_client: Arc<G>,
    ) -> Self {
        Self {
            payment_repo,
            course_repo,
            lesson_repo,
            stripe_client,
        }
    }

    pub async fn list(
        &self,
        actor: Actor,
        query: ListPaymentsQuery,
    ) -> UseCaseResult<Vec<PaymentDto>> {
        let filter = query
            .into_filter(actor.user_id)
            .map_err(|field| UseCaseError::field(field, "Select a valid choice."))?;

        let payments = self.payment_repo.list(filter).await.map_err(|err| {
            error!(user_id = %actor.user_id, db_error = ?err, "payments: failed to list");
            UseCaseError::Internal(err)
        })?;

        Ok(payments.into_iter().map(PaymentDto::from).collect())
    }

    /// Records a cash or transfer payment. Gateway payments only come from
    /// [`Self::create_checkout`].
    pub async fn create(&self, actor: Actor, model: PaymentModel) -> UseCaseResult<PaymentDto> {
        authorize(&actor, ResourceKind::Payment, Action::Create, actor.user_id)?;
        let (Some(payment_method), Some(amount)) = (model.payment_method, model.amount) else {
            UseCaseError::require(&model.missing_required())?;
            return Err(UseCaseError::BadRequest("Invalid input.".to_string()));
        };

        Self::manual_method(Some(payment_method))?;
        let amount_minor = minor_units(amount)?;
        self.check_references(model.course, model.lesson).await?;

        let payment = self
            .payment_repo
            .create(InsertPaymentEntity {
                user_id: actor.user_id,
                course_id: model.course,
                lesson_id: model.lesson,
                amount_minor,
                payment_method: payment_method.to_string(),
                status: PaymentStatus::Paid.to_string(),
            })
            .await
            .map_err(|err| {
                error!(
                    user_id = %actor.user_id,
                    db_error = ?err,
                    "payments: failed to record payment"
                );
                UseCaseError::Internal(err)
            })?;

        info!(
            user_id = %actor.user_id,
            payment_id = %payment.id,
            payment_method = %payment_method,
            "payments: manual payment recorded"
        );
        Ok(payment.into())
    }

    pub async fn retrieve(&self, actor: Actor, payment_id: Uuid) -> UseCaseResult<PaymentDto> {
        let payment = self.load(payment_id).await?;
        authorize(&actor, ResourceKind::Payment, Action::Retrieve, payment.user)?;

        Ok(payment)
    }

    pub async fn update(
        &self,
        actor: Actor,
        payment_id: Uuid,
        model: PaymentModel,
        partial: bool,
    ) -> UseCaseResult<PaymentDto> {
        let current = self.load(payment_id).await?;
        authorize(&actor, ResourceKind::Payment, Action::Update, current.user)?;

        if current.payment_method == PaymentMethod::Stripe.as_str() {
            return Err(UseCaseError::BadRequest(
                "Stripe payments cannot be edited.".to_string(),
            ));
        }
        if !partial {
            UseCaseError::require(&model.missing_required())?;
        }

        let payment_method = Self::manual_method(model.payment_method)?;
        let amount_minor = Self::amount_minor(model.amount)?;
        self.check_references(model.course, model.lesson).await?;

        // A full replace clears references that were left out.
        let (course_id, lesson_id) = if partial {
            (model.course.map(Some), model.lesson.map(Some))
        } else {
            (Some(model.course), Some(model.lesson))
        };

        let changes = UpdatePaymentEntity {
            course_id,
            lesson_id,
            amount_minor,
            payment_method: payment_method.map(|method| method.to_string()),
            updated_at: Some(Utc::now()),
        };
        if changes.is_empty() {
            return Ok(current);
        }

        let payment = self
            .payment_repo
            .update(payment_id, changes)
            .await
            .map_err(|err| {
                error!(%payment_id, db_error = ?err, "payments: failed to update");
                UseCaseError::Internal(err)
            })?;

        info!(user_id = %actor.user_id, %payment_id, "payments: updated");
        Ok(payment.into())
    }

    pub async fn delete(&self, actor: Actor, payment_id: Uuid) -> UseCaseResult<()> {
        let current = self.load(payment_id).await?;
        authorize(&actor, ResourceKind::Payment, Action::Delete, current.user)?;

        self.payment_repo.delete(payment_id).await.map_err(|err| {
            error!(%payment_id, db_error = ?err, "payments: failed to delete");
            UseCaseError::Internal(err)
        })?;

        info!(user_id = %actor.user_id, %payment_id, "payments: deleted");
        Ok(())
    }

    /// Two-phase Stripe checkout.
    ///
    /// The payment row is written as `pending` before any gateway call and
    /// confirmed as `open` once the session exists. A gateway failure marks
    /// the row `failed` and undoes whatever was already created upstream.
    pub async fn create_checkout(
        &self,
        actor: Actor,
        model: CheckoutModel,
    ) -> UseCaseResult<CheckoutDto> {
        let user_id = actor.user_id;
        let Some(amount) = model.amount else {
            return Err(UseCaseError::field("amount", REQUIRED_FIELD));
        };
        let amount_minor = minor_units(amount)?;
        let Some(course_id) = model.course else {
            return Err(UseCaseError::field("course", REQUIRED_FIELD));
        };

        let course = self
            .course_repo
            .find_by_id(course_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %course_id,
                    db_error = ?err,
                    "payments: failed to load course for checkout"
                );
                UseCaseError::Internal(err)
            })?
            .ok_or(UseCaseError::NotFound("course"))?;

        info!(%user_id, %course_id, amount_minor, "payments: checkout requested");

        let payment = self
            .payment_repo
            .create(InsertPaymentEntity {
                user_id,
                course_id: Some(course_id),
                lesson_id: None,
                amount_minor,
                payment_method: PaymentMethod::Stripe.to_string(),
                status: PaymentStatus::Pending.to_string(),
            })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %course_id,
                    db_error = ?err,
                    "payments: failed to insert pending payment"
                );
                UseCaseError::Internal(err)
            })?;
        let payment_id = payment.id;

        let mut upstream = CreatedUpstream::default();

        let product_id = match self.stripe_client.create_product(&course.title).await {
            Ok(id) => id,
            Err(err) => return Err(self.fail_checkout(payment_id, err, upstream).await),
        };
        upstream.product_id = Some(product_id.clone());

        let price_id = match self
            .stripe_client
            .create_price(&product_id, amount_minor)
            .await
        {
            Ok(id) => id,
            Err(err) => return Err(self.fail_checkout(payment_id, err, upstream).await),
        };
        upstream.price_id = Some(price_id.clone());

        let metadata = HashMap::from([
            ("course_id".to_string(), course_id.to_string()),
            ("payment_id".to_string(), payment_id.to_string()),
        ]);
        let session = match self
            .stripe_client
            .create_checkout_session(&price_id, metadata)
            .await
        {
            Ok(session) => session,
            Err(err) => return Err(self.fail_checkout(payment_id, err, upstream).await),
        };
        upstream.session_id = Some(session.id.clone());

        let confirmed = self
            .payment_repo
            .attach_checkout_session(
                payment_id,
                CheckoutSessionChangeset {
                    status: PaymentStatus::Open.to_string(),
                    gateway_product_id: Some(product_id),
                    gateway_price_id: Some(price_id),
                    gateway_session_id: Some(session.id.clone()),
                    gateway_checkout_url: Some(session.url.clone()),
                    updated_at: Utc::now(),
                },
            )
            .await;
        if let Err(err) = confirmed {
            error!(%payment_id, db_error = ?err, "payments: failed to confirm checkout session");
            self.undo_upstream(payment_id, &upstream).await;
            return Err(UseCaseError::Internal(err));
        }

        info!(%user_id, %payment_id, session_id = %session.id, "payments: checkout session opened");
        Ok(CheckoutDto {
            payment_id,
            checkout_url: session.url,
        })
    }

    /// Applies a signed Stripe event to the payment owning its session.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> UseCaseResult<()> {
        let Some(signature) = signature else {
            warn!("payments: webhook without signature header");
            return Err(UseCaseError::BadRequest(
                "Missing Stripe-Signature header.".to_string(),
            ));
        };

        let event = self
            .stripe_client
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                warn!(error = %err, "payments: webhook signature rejected");
                UseCaseError::BadRequest("Invalid webhook signature.".to_string())
            })?;

        let status = match event.type_.as_str() {
            "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
                PaymentStatus::Paid
            }
            "checkout.session.async_payment_failed" => PaymentStatus::Failed,
            "checkout.session.expired" => PaymentStatus::Expired,
            other => {
                debug!(event_type = other, "payments: webhook event ignored");
                return Ok(());
            }
        };

        let session = StripeClient::extract_checkout_session(&event).ok_or_else(|| {
            UseCaseError::BadRequest("Webhook payload is not a checkout session.".to_string())
        })?;

        // Delayed payment methods complete the session before funds arrive.
        if status == PaymentStatus::Paid
            && event.type_ == "checkout.session.completed"
            && session.payment_status.as_deref() == Some("unpaid")
        {
            debug!(session_id = %session.id, "payments: session completed but not yet paid");
            return Ok(());
        }

        let updated = self
            .payment_repo
            .update_status_by_session_id(session.id.clone(), status)
            .await
            .map_err(|err| {
                error!(
                    session_id = %session.id,
                    db_error = ?err,
                    "payments: failed to apply webhook"
                );
                UseCaseError::Internal(err)
            })?;

        match updated {
            Some(payment_id) => {
                info!(
                    %payment_id,
                    session_id = %session.id,
                    status = %status,
                    "payments: status updated from webhook"
                )
            }
            None => warn!(session_id = %session.id, "payments: webhook for unknown session"),
        }
        Ok(())
    }

    async fn fail_checkout(
        &self,
        payment_id: Uuid,
        err: anyhow::Error,
        upstream: CreatedUpstream,
    ) -> UseCaseError {
        let message = err.to_string();
        error!(%payment_id, gateway_error = ?err, "payments: checkout gateway call failed");

        if let Err(db_err) = self
            .payment_repo
            .mark_failed(payment_id, message.clone())
            .await
        {
            error!(%payment_id, db_error = ?db_err, "payments: failed to mark payment failed");
        }
        self.undo_upstream(payment_id, &upstream).await;

        UseCaseError::Gateway(message)
    }

    /// Best effort; every failure is logged and skipped.
    async fn undo_upstream(&self, payment_id: Uuid, upstream: &CreatedUpstream) {
        if let Some(session_id) = upstream.session_id.as_deref() {
            if let Err(err) = self.stripe_client.expire_checkout_session(session_id).await {
                warn!(
                    %payment_id,
                    %session_id,
                    error = ?err,
                    "payments: failed to expire checkout session"
                );
            }
        }
        if let Some(price_id) = upstream.price_id.as_deref() {
            if let Err(err) = self.stripe_client.deactivate_price(price_id).await {
                warn!(%payment_id, %price_id, error = ?err, "payments: failed to deactivate price");
            }
        }
        if let Some(product_id) = upstream.product_id.as_deref() {
            if let Err(err) = self.stripe_client.archive_product(product_id).await {
                warn!(
                    %payment_id,
                    %product_id,
                    error = ?err,
                    "payments: failed to archive product"
                );
            }
        }
    }

    fn manual_method(method: Option<PaymentMethod>) -> UseCaseResult<Option<PaymentMethod>> {
        match method {
            Some(method) if method.is_gateway() => Err(UseCaseError::field(
                "payment_method",
                "Stripe payments are created through checkout.",
            )),
            other => Ok(other),
        }
    }

    fn amount_minor(amount: Option<Decimal>) -> UseCaseResult<Option<i64>> {
        match amount {
            None => Ok(None),
            Some(amount) => minor_units(amount).map(Some),
        }
    }

    async fn check_references(
        &self,
        course_id: Option<Uuid>,
        lesson_id: Option<Uuid>,
    ) -> UseCaseResult<()> {
        if let Some(course_id) = course_id {
            let course = self.course_repo.find_by_id(course_id).await.map_err(|err| {
                error!(%course_id, db_error = ?err, "payments: failed to load referenced course");
                UseCaseError::Internal(err)
            })?;
            if course.is_none() {
                return Err(UseCaseError::field(
                    "course",
                    format!("Invalid pk \"{course_id}\" - object does not exist."),
                ));
            }
        }

        if let Some(lesson_id) = lesson_id {
            let lesson = self.lesson_repo.find_by_id(lesson_id).await.map_err(|err| {
                error!(%lesson_id, db_error = ?err, "payments: failed to load referenced lesson");
                UseCaseError::Internal(err)
            })?;
            if lesson.is_none() {
                return Err(UseCaseError::field(
                    "lesson",
                    format!("Invalid pk \"{lesson_id}\" - object does not exist."),
                ));
            }
        }

        Ok(())
    }

    async fn load(&self, payment_id: Uuid) -> UseCaseResult<PaymentDto> {
        self.payment_repo
            .find_by_id(payment_id)
            .await
            .map_err(|err| {
                error!(%payment_id, db_error = ?err, "payments: failed to load");
                UseCaseError::Internal(err)
            })?
            .map(PaymentDto::from)
            .ok_or(UseCaseError::NotFound("payment"))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use chrono::Utc;
    use lms_core::{
        domain::{
            entities::{courses::CourseEntity, payments::PaymentEntity},
            repositories::{
                courses::MockCourseRepository, lessons::MockLessonRepository,
                payments::MockPaymentRepository,
            },
            value_objects::enums::user_roles::UserRole,
        },
        payments::stripe_client::StripeEventData,
    };
    use mockall::predicate::eq;
    use serde_json::json;

    type TestUseCase = PaymentUseCase<
        MockPaymentRepository,
        MockCourseRepository,
        MockLessonRepository,
        MockStripeGateway,
    >;

    fn usecase(
        payment_repo: MockPaymentRepository,
        course_repo: MockCourseRepository,
        stripe: MockStripeGateway,
    ) -> TestUseCase {
        PaymentUseCase::new(
            Arc::new(payment_repo),
            Arc::new(course_repo),
            Arc::new(MockLessonRepository::new()),
            Arc::new(stripe),
        )
    }

    fn course_repo_with(course_id: Uuid) -> MockCourseRepository {
        let mut course_repo = MockCourseRepository::new();
        course_repo.expect_find_by_id().returning(move |id| {
            if id != course_id {
                return Ok(None);
            }
            let now = Utc::now();
            Ok(Some(CourseEntity {
                id,
                title: "Rust for pythonistas".to_string(),
                description: "d".to_string(),
                preview: None,
                owner_id: Uuid::new_v4(),
                created_at: now,
                updated_at: now,
            }))
        });
        course_repo
    }

    fn payment_from(entity: InsertPaymentEntity) -> PaymentEntity {
        let now = Utc::now();
        PaymentEntity {
            id: Uuid::new_v4(),
            user_id: entity.user_id,
            payment_date: now,
            course_id: entity.course_id,
            lesson_id: entity.lesson_id,
            amount_minor: entity.amount_minor,
            payment_method: entity.payment_method,
            status: entity.status,
            gateway_product_id: None,
            gateway_price_id: None,
            gateway_session_id: None,
            gateway_checkout_url: None,
            error: None,
            updated_at: now,
        }
    }

    fn checkout(course_id: Uuid, amount: &str) -> CheckoutModel {
        CheckoutModel {
            course: Some(course_id),
            amount: Some(Decimal::from_str(amount).unwrap()),
        }
    }

    fn event(type_: &str, object: serde_json::Value) -> StripeEvent {
        StripeEvent {
            id: Some("evt_1".to_string()),
            type_: type_.to_string(),
            created: None,
            data: StripeEventData { object },
        }
    }

    #[tokio::test]
    async fn checkout_opens_session_and_confirms_row() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let course_id = Uuid::new_v4();

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_create()
            .withf(|entity| {
                entity.payment_method == "stripe"
                    && entity.status == "pending"
                    && entity.amount_minor == 10_000
            })
            .times(1)
            .returning(|entity| Ok(payment_from(entity)));
        payment_repo
            .expect_attach_checkout_session()
            .withf(|_, changeset| {
                changeset.status == "open"
                    && changeset.gateway_session_id.as_deref() == Some("cs_1")
                    && changeset.gateway_price_id.as_deref() == Some("price_1")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        payment_repo.expect_mark_failed().never();

        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_create_product()
            .withf(|name| name == "Rust for pythonistas")
            .times(1)
            .returning(|_| Ok("prod_1".to_string()));
        stripe
            .expect_create_price()
            .withf(|product_id, amount| product_id == "prod_1" && *amount == 10_000)
            .times(1)
            .returning(|_, _| Ok("price_1".to_string()));
        stripe
            .expect_create_checkout_session()
            .withf(move |price_id, metadata| {
                price_id == "price_1"
                    && metadata.get("course_id") == Some(&course_id.to_string())
                    && metadata.contains_key("payment_id")
            })
            .times(1)
            .returning(|_, _| {
                Ok(CheckoutSessionHandle {
                    id: "cs_1".to_string(),
                    url: "https://checkout.stripe.com/c/pay/cs_1".to_string(),
                })
            });

        let usecase = usecase(payment_repo, course_repo_with(course_id), stripe);

        let dto = usecase
            .create_checkout(actor, checkout(course_id, "100"))
            .await
            .unwrap();
        assert_eq!(dto.checkout_url, "https://checkout.stripe.com/c/pay/cs_1");
    }

    #[tokio::test]
    async fn checkout_for_unknown_course_is_not_found() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_create().never();
        let mut stripe = MockStripeGateway::new();
        stripe.expect_create_product().never();

        let usecase = usecase(payment_repo, course_repo_with(Uuid::new_v4()), stripe);

        let result = usecase
            .create_checkout(actor, checkout(Uuid::new_v4(), "10"))
            .await;
        assert!(matches!(result, Err(UseCaseError::NotFound("course"))));
    }

    #[tokio::test]
    async fn checkout_requires_positive_amount() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let course_id = Uuid::new_v4();
        let usecase = usecase(
            MockPaymentRepository::new(),
            course_repo_with(course_id),
            MockStripeGateway::new(),
        );

        let missing = usecase
            .create_checkout(
                actor,
                CheckoutModel {
                    course: Some(course_id),
                    amount: None,
                },
            )
            .await;
        match missing {
            Err(UseCaseError::Validation(errors)) => assert!(errors.contains_key("amount")),
            other => panic!("unexpected result: {other:?}"),
        }

        let zero = usecase.create_checkout(actor, checkout(course_id, "0")).await;
        match zero {
            Err(UseCaseError::Validation(errors)) => {
                assert_eq!(errors["amount"], vec![POSITIVE_AMOUNT.to_string()])
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_checkout_amount_is_a_field_error() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let course_id = Uuid::new_v4();
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_create().never();
        let usecase = usecase(
            payment_repo,
            course_repo_with(course_id),
            MockStripeGateway::new(),
        );

        let result = usecase
            .create_checkout(
                actor,
                CheckoutModel {
                    course: Some(course_id),
                    amount: Some(Decimal::from_scientific("1e28").unwrap()),
                },
            )
            .await;

        match result {
            Err(UseCaseError::Validation(errors)) => {
                assert_eq!(errors["amount"], vec![AMOUNT_TOO_LARGE.to_string()])
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn gateway_failure_marks_row_failed_and_archives_product() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let course_id = Uuid::new_v4();

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_create()
            .returning(|entity| Ok(payment_from(entity)));
        payment_repo
            .expect_mark_failed()
            .withf(|_, message| message == "Invalid currency: xyz")
            .times(1)
            .returning(|_, _| Ok(()));
        payment_repo.expect_attach_checkout_session().never();

        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_create_product()
            .returning(|_| Ok("prod_1".to_string()));
        stripe
            .expect_create_price()
            .returning(|_, _| Err(anyhow::anyhow!("Invalid currency: xyz")));
        stripe
            .expect_archive_product()
            .withf(|product_id| product_id == "prod_1")
            .times(1)
            .returning(|_| Ok(()));
        stripe.expect_deactivate_price().never();
        stripe.expect_create_checkout_session().never();

        let usecase = usecase(payment_repo, course_repo_with(course_id), stripe);

        let result = usecase.create_checkout(actor, checkout(course_id, "19.99")).await;
        match result {
            Err(UseCaseError::Gateway(message)) => assert_eq!(message, "Invalid currency: xyz"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_confirmation_expires_session_and_cleans_up() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let course_id = Uuid::new_v4();

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_create()
            .returning(|entity| Ok(payment_from(entity)));
        payment_repo
            .expect_attach_checkout_session()
            .returning(|_, _| Err(anyhow::anyhow!("connection reset")));

        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_create_product()
            .returning(|_| Ok("prod_1".to_string()));
        stripe
            .expect_create_price()
            .returning(|_, _| Ok("price_1".to_string()));
        stripe.expect_create_checkout_session().returning(|_, _| {
            Ok(CheckoutSessionHandle {
                id: "cs_1".to_string(),
                url: "https://checkout.stripe.com/c/pay/cs_1".to_string(),
            })
        });
        stripe
            .expect_expire_checkout_session()
            .times(1)
            .returning(|_| Ok(()));
        stripe.expect_deactivate_price().times(1).returning(|_| Ok(()));
        stripe.expect_archive_product().times(1).returning(|_| Ok(()));

        let usecase = usecase(payment_repo, course_repo_with(course_id), stripe);

        let result = usecase.create_checkout(actor, checkout(course_id, "5")).await;
        assert!(matches!(result, Err(UseCaseError::Internal(_))));
    }

    #[tokio::test]
    async fn webhook_with_bad_signature_is_rejected() {
        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_verify_webhook_signature()
            .returning(|_, _| Err(anyhow::anyhow!("invalid webhook signature")));
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_update_status_by_session_id().never();

        let usecase = usecase(payment_repo, MockCourseRepository::new(), stripe);

        let result = usecase.handle_webhook(b"{}", Some("t=1,v1=00")).await;
        assert!(matches!(result, Err(UseCaseError::BadRequest(_))));

        let missing = usecase.handle_webhook(b"{}", None).await;
        assert!(matches!(missing, Err(UseCaseError::BadRequest(_))));
    }

    #[tokio::test]
    async fn completed_session_marks_payment_paid() {
        let mut stripe = MockStripeGateway::new();
        stripe.expect_verify_webhook_signature().returning(|_, _| {
            Ok(event(
                "checkout.session.completed",
                json!({ "id": "cs_1", "payment_status": "paid" }),
            ))
        });
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_update_status_by_session_id()
            .with(eq("cs_1".to_string()), eq(PaymentStatus::Paid))
            .times(1)
            .returning(|_, _| Ok(Some(Uuid::new_v4())));

        let usecase = usecase(payment_repo, MockCourseRepository::new(), stripe);

        assert!(usecase.handle_webhook(b"{}", Some("sig")).await.is_ok());
    }

    #[tokio::test]
    async fn unrelated_events_are_ignored() {
        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_verify_webhook_signature()
            .returning(|_, _| Ok(event("customer.created", json!({ "id": "cus_1" }))));
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_update_status_by_session_id().never();

        let usecase = usecase(payment_repo, MockCourseRepository::new(), stripe);

        assert!(usecase.handle_webhook(b"{}", Some("sig")).await.is_ok());
    }

    #[tokio::test]
    async fn manual_payment_rejects_stripe_method() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_create().never();

        let usecase = usecase(payment_repo, MockCourseRepository::new(), MockStripeGateway::new());

        let result = usecase
            .create(
                actor,
                PaymentModel {
                    amount: Some(Decimal::from(50)),
                    payment_method: Some(PaymentMethod::Stripe),
                    ..Default::default()
                },
            )
            .await;
        match result {
            Err(UseCaseError::Validation(errors)) => assert!(errors.contains_key("payment_method")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cash_payment_is_recorded_as_paid() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_create()
            .withf(move |entity| {
                entity.user_id == actor.user_id
                    && entity.status == "paid"
                    && entity.payment_method == "cash"
                    && entity.amount_minor == 5_050
            })
            .times(1)
            .returning(|entity| Ok(payment_from(entity)));

        let usecase = usecase(payment_repo, MockCourseRepository::new(), MockStripeGateway::new());

        let dto = usecase
            .create(
                actor,
                PaymentModel {
                    amount: Some(Decimal::from_str("50.50").unwrap()),
                    payment_method: Some(PaymentMethod::Cash),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(dto.status, PaymentStatus::Paid);
        assert_eq!(dto.amount, Decimal::from_str("50.50").unwrap());
    }

    #[tokio::test]
    async fn payments_of_others_are_forbidden_even_for_moderators() {
        let moderator = Actor::new(Uuid::new_v4(), UserRole::Moderator);
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_find_by_id().returning(|id| {
            let mut payment = payment_from(InsertPaymentEntity {
                user_id: Uuid::new_v4(),
                course_id: None,
                lesson_id: None,
                amount_minor: 100,
                payment_method: "cash".to_string(),
                status: "paid".to_string(),
            });
            payment.id = id;
            Ok(Some(payment))
        });
        payment_repo.expect_delete().never();

        let usecase = usecase(payment_repo, MockCourseRepository::new(), MockStripeGateway::new());

        assert!(matches!(
            usecase.retrieve(moderator, Uuid::new_v4()).await,
            Err(UseCaseError::Forbidden)
        ));
        assert!(matches!(
            usecase.delete(moderator, Uuid::new_v4()).await,
            Err(UseCaseError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn list_rejects_unknown_filter_values() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_list().never();

        let usecase = usecase(payment_repo, MockCourseRepository::new(), MockStripeGateway::new());

        let result = usecase
            .list(
                actor,
                ListPaymentsQuery {
                    ordering: Some("amount".to_string()),
                    ..Default::default()
                },
            )
            .await;
        match result {
            Err(UseCaseError::Validation(errors)) => assert!(errors.contains_key("ordering")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
